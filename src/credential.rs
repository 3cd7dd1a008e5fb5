//! The cached user credential and its `token.json` representation.
//!
//! The layout matches Google's "authorized user" JSON so other Google client
//! libraries can read the file directly.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::client_secret::{ClientSecret, DEFAULT_TOKEN_URI};
use crate::error::{AuthError, Result};
use crate::oauth::token_endpoint::TokenResponse;

/// A token is treated as expired this long before its actual expiry.
pub const REFRESH_THRESHOLD_SECS: i64 = 225;

pub const DEFAULT_UNIVERSE_DOMAIN: &str = "googleapis.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, deserialize_with = "scope_list::deserialize")]
    pub scopes: Vec<String>,
    #[serde(default = "default_universe_domain")]
    pub universe_domain: String,
    #[serde(default)]
    pub account: String,
    #[serde(default, with = "expiry_format", skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}
fn default_universe_domain() -> String {
    DEFAULT_UNIVERSE_DOMAIN.to_string()
}

impl Credential {
    /// Build a fresh credential from a code-exchange response.
    ///
    /// The record keeps the requested scopes, in request order.
    pub fn from_token_response(
        secret: &ClientSecret,
        scopes: &[String],
        response: &TokenResponse,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if response.access_token.is_empty() {
            return Err(AuthError::InvalidTokenResponse(
                "access_token is empty".to_string(),
            ));
        }
        Ok(Self {
            token: Some(response.access_token.clone()),
            refresh_token: response.refresh_token.clone(),
            token_uri: secret.token_uri.clone(),
            client_id: secret.client_id.clone(),
            client_secret: secret.client_secret.clone(),
            scopes: scopes.to_vec(),
            universe_domain: default_universe_domain(),
            account: String::new(),
            expiry: response.expiry_from(now),
            token_type: response.token_type.clone(),
        })
    }

    /// Replace the access token and expiry after a refresh.
    ///
    /// A rotated refresh token replaces the stored one; scopes are unchanged.
    /// A reply that reports a narrower grant than the stored scopes is
    /// rejected and leaves the credential as it was.
    pub fn apply_refresh(&mut self, response: &TokenResponse, now: DateTime<Utc>) -> Result<()> {
        let missing = response.ungranted(&self.scopes);
        if !missing.is_empty() {
            return Err(AuthError::ScopesNotGranted(missing));
        }
        self.token = Some(response.access_token.clone());
        self.expiry = response.expiry_from(now);
        if let Some(rotated) = &response.refresh_token {
            self.refresh_token = Some(rotated.clone());
        }
        if response.token_type.is_some() {
            self.token_type = response.token_type.clone();
        }
        Ok(())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry - TimeDelta::seconds(REFRESH_THRESHOLD_SECS),
            None => false,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty()) && !self.is_expired_at(now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Requested scopes this credential does not cover, in request order.
    pub fn missing_scopes(&self, requested: &[String]) -> Vec<String> {
        requested
            .iter()
            .filter(|s| !self.scopes.contains(s))
            .cloned()
            .collect()
    }

    /// True when the stored scope set is a superset of `requested`.
    pub fn has_scopes(&self, requested: &[String]) -> bool {
        self.missing_scopes(requested).is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// `expiry` is written as naive UTC with microseconds and a trailing `Z`.
/// Reading accepts RFC 3339, or the same form without fraction or `Z`.
mod expiry_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
    const READ_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(WRITE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s).map(Some).map_err(serde::de::Error::custom),
        }
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        let base = s.trim_end_matches('Z');
        let base = base.split('.').next().unwrap_or(base);
        NaiveDateTime::parse_from_str(base, READ_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid expiry {:?}: {}", s, e))
    }
}

/// `scopes` is normally a list, but a space-separated string is accepted too.
mod scope_list {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw: Option<Raw> = Option::deserialize(deserializer)?;
        Ok(match raw {
            Some(Raw::List(v)) => v,
            Some(Raw::Joined(s)) => s.split_whitespace().map(str::to_string).collect(),
            None => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(expiry: Option<DateTime<Utc>>) -> Credential {
        Credential {
            token: Some("tok".to_string()),
            refresh_token: Some("ref".to_string()),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            client_id: "cid".to_string(),
            client_secret: Some("csecret".to_string()),
            scopes: vec![crate::config::GMAIL_READONLY.to_string()],
            universe_domain: DEFAULT_UNIVERSE_DOMAIN.to_string(),
            account: String::new(),
            expiry,
            token_type: None,
        }
    }

    #[test]
    fn test_expiry_written_with_microseconds_and_z() {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let json = sample(Some(at)).to_json().unwrap();
        assert!(json.contains("\"expiry\": \"2025-03-04T05:06:07.000000Z\""));
    }

    #[test]
    fn test_expiry_lenient_parse() {
        let want = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        for s in [
            "2025-03-04T05:06:07.123456Z",
            "2025-03-04T05:06:07Z",
            "2025-03-04T05:06:07",
            "2025-03-04T05:06:07+00:00",
        ] {
            let got = expiry_format::parse(s).unwrap();
            assert_eq!(got.timestamp(), want.timestamp(), "{s}");
        }
        assert!(expiry_format::parse("yesterday").is_err());
    }

    #[test]
    fn test_expired_uses_threshold() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let soon = sample(Some(now + TimeDelta::seconds(100)));
        assert!(soon.is_expired_at(now));
        assert!(!soon.is_valid_at(now));

        let later = sample(Some(now + TimeDelta::seconds(3600)));
        assert!(!later.is_expired_at(now));
        assert!(later.is_valid_at(now));
    }

    #[test]
    fn test_no_expiry_never_expires() {
        let cred = sample(None);
        assert!(!cred.is_expired());
        assert!(cred.is_valid());
    }

    #[test]
    fn test_missing_access_token_is_invalid() {
        let mut cred = sample(None);
        cred.token = None;
        assert!(!cred.is_valid());
    }

    #[test]
    fn test_has_scopes_superset() {
        let mut cred = sample(None);
        cred.scopes = vec![
            crate::config::GMAIL_SEND.to_string(),
            crate::config::GMAIL_READONLY.to_string(),
        ];
        assert!(cred.has_scopes(&[crate::config::GMAIL_READONLY.to_string()]));
        assert!(!cred.has_scopes(&["https://mail.google.com/".to_string()]));
        assert_eq!(
            cred.missing_scopes(&[
                "https://mail.google.com/".to_string(),
                crate::config::GMAIL_SEND.to_string()
            ]),
            vec!["https://mail.google.com/".to_string()]
        );
    }

    fn refresh_reply(scope: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "tok_2".to_string(),
            expires_in: Some(3600),
            refresh_token: None,
            scope: scope.map(str::to_string),
            token_type: Some("Bearer".to_string()),
        }
    }

    #[test]
    fn test_apply_refresh_rejects_narrower_grant() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let mut cred = sample(Some(now));
        cred.scopes = vec![
            crate::config::GMAIL_SEND.to_string(),
            crate::config::GMAIL_READONLY.to_string(),
        ];
        let before = cred.clone();

        let err = cred
            .apply_refresh(&refresh_reply(Some(crate::config::GMAIL_READONLY)), now)
            .unwrap_err();
        match err {
            AuthError::ScopesNotGranted(missing) => {
                assert_eq!(missing, vec![crate::config::GMAIL_SEND.to_string()])
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(cred, before);
    }

    #[test]
    fn test_apply_refresh_accepts_full_or_unreported_grant() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let mut cred = sample(Some(now));
        let granted = format!("openid {}", crate::config::GMAIL_READONLY);
        cred.apply_refresh(&refresh_reply(Some(&granted)), now).unwrap();
        assert_eq!(cred.token.as_deref(), Some("tok_2"));
        assert_eq!(cred.expiry, Some(now + TimeDelta::seconds(3600)));

        cred.apply_refresh(&refresh_reply(None), now).unwrap();
        assert_eq!(cred.refresh_token.as_deref(), Some("ref"));
    }

    #[test]
    fn test_reads_authorized_user_json() {
        let json = br#"{
            "token": "ya29.x",
            "refresh_token": "1//r",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "cid",
            "client_secret": "cs",
            "scopes": ["https://www.googleapis.com/auth/gmail.readonly"],
            "universe_domain": "googleapis.com",
            "account": "",
            "expiry": "2030-01-01T00:00:00.000000Z"
        }"#;
        let cred = Credential::from_json(json).unwrap();
        assert_eq!(cred.token.as_deref(), Some("ya29.x"));
        assert!(cred.can_refresh());
        assert!(cred.expiry.is_some());
    }

    #[test]
    fn test_reads_space_joined_scopes() {
        let json = br#"{"client_id":"cid","scopes":"a b"}"#;
        let cred = Credential::from_json(json).unwrap();
        assert_eq!(cred.scopes, vec!["a", "b"]);
        assert_eq!(cred.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_missing_client_id_is_error() {
        assert!(Credential::from_json(br#"{"token":"t"}"#).is_err());
    }

    #[test]
    fn test_none_fields_omitted() {
        let mut cred = sample(None);
        cred.refresh_token = None;
        let json = cred.to_json().unwrap();
        assert!(!json.contains("refresh_token"));
        assert!(!json.contains("expiry"));
        assert!(json.contains("\"universe_domain\": \"googleapis.com\""));
    }
}
