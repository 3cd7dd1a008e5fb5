//! Token endpoint client (authorization_code and refresh_token grants).

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::client_secret::ClientSecret;
use crate::credential::Credential;
use crate::error::{AuthError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in
            .map(|secs| now + TimeDelta::seconds(secs.max(0)))
    }

    /// Scopes the provider reports as granted, if it reported any.
    pub fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
    }

    /// Requested scopes missing from the reported grant, in request order.
    /// Empty when the provider did not report a grant.
    pub fn ungranted(&self, requested: &[String]) -> Vec<String> {
        match self.granted_scopes() {
            Some(granted) => requested
                .iter()
                .filter(|s| !granted.contains(s))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Blocking HTTP client for the provider's token endpoint.
pub struct TokenClient {
    agent: ureq::Agent,
}

impl TokenClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(concat!("gmail-token/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }

    /// Trade an authorization code for tokens.
    pub fn exchange_code(
        &self,
        secret: &ClientSecret,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse> {
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code.trim()),
            ("redirect_uri", redirect_uri),
            ("client_id", secret.client_id.trim()),
            ("code_verifier", code_verifier),
        ];
        if let Some(cs) = secret.client_secret.as_deref().map(str::trim) {
            if !cs.is_empty() {
                form.push(("client_secret", cs));
            }
        }
        tracing::debug!(token_uri = %secret.token_uri, "exchanging authorization code");
        self.post_form(&secret.token_uri, &form)
    }

    /// Use a credential's refresh token to get a new access token.
    pub fn refresh(&self, credential: &Credential) -> Result<TokenResponse> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoRefreshToken)?;

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", credential.client_id.trim()),
        ];
        if let Some(cs) = credential.client_secret.as_deref().map(str::trim) {
            if !cs.is_empty() {
                form.push(("client_secret", cs));
            }
        }
        tracing::debug!(token_uri = %credential.token_uri, "refreshing access token");
        self.post_form(&credential.token_uri, &form)
    }

    fn post_form(&self, uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .agent
            .post(uri)
            .set("Accept", "application/json")
            .send_form(form)?;
        let body = response.into_string()?;
        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))?;
        if parsed.access_token.trim().is_empty() {
            return Err(AuthError::InvalidTokenResponse(
                "access_token is empty".to_string(),
            ));
        }
        Ok(parsed)
    }
}

/// Pull `error` / `error_description` out of an error response body.
///
/// Handles the OAuth form (`{"error": "invalid_grant", ...}`) and Google's
/// API form (`{"error": {"status": ..., "message": ...}}`).
pub fn parse_error_body(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, None);
    };
    match value.get("error") {
        Some(Value::String(code)) => {
            let description = value
                .get("error_description")
                .and_then(Value::as_str)
                .map(str::to_string);
            (Some(code.clone()), description)
        }
        Some(Value::Object(obj)) => {
            let code = obj.get("status").and_then(Value::as_str).map(str::to_string);
            let message = obj.get("message").and_then(Value::as_str).map(str::to_string);
            (code, message)
        }
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_oauth_error_body() {
        let (code, desc) =
            parse_error_body(r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#);
        assert_eq!(code.as_deref(), Some("invalid_grant"));
        assert_eq!(desc.as_deref(), Some("Token has been expired or revoked."));
    }

    #[test]
    fn test_parse_api_error_body() {
        let (code, desc) = parse_error_body(
            r#"{"error":{"code":400,"message":"Invalid request","status":"INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(code.as_deref(), Some("INVALID_ARGUMENT"));
        assert_eq!(desc.as_deref(), Some("Invalid request"));
    }

    #[test]
    fn test_parse_non_json_error_body() {
        assert_eq!(parse_error_body("<html>bad gateway</html>"), (None, None));
    }

    #[test]
    fn test_expiry_from_expires_in() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":3600}"#).unwrap();
        assert_eq!(resp.expiry_from(now), Some(now + TimeDelta::seconds(3600)));
    }

    #[test]
    fn test_granted_scopes_split() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","scope":"x y"}"#).unwrap();
        assert_eq!(resp.granted_scopes(), Some(vec!["x".to_string(), "y".to_string()]));
    }

    #[test]
    fn test_ungranted_in_request_order() {
        let requested = ["z".to_string(), "x".to_string(), "w".to_string()];
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","scope":"x y"}"#).unwrap();
        assert_eq!(resp.ungranted(&requested), vec!["z".to_string(), "w".to_string()]);

        let unreported: TokenResponse = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        assert!(unreported.ungranted(&requested).is_empty());
    }

    #[test]
    fn test_id_token_in_reply_is_ignored() {
        let resp: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","id_token":"eyJ.x.y"}"#).unwrap();
        assert_eq!(resp.access_token, "a");
    }
}
