//! Shared test fixtures and helpers.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use tempfile::TempDir;

use gmail_token::bootstrap::Authorizer;
use gmail_token::client_secret::ClientSecret;
use gmail_token::config::{GMAIL_READONLY, GMAIL_SEND, Settings};
use gmail_token::credential::Credential;
use gmail_token::error::{AuthError, Result};

/// Temporary working directory plus the two file paths the bootstrapper uses.
pub fn sandbox() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let credentials = tmp.path().join("credentials.json");
    let token = tmp.path().join("token.json");
    (tmp, credentials, token)
}

pub fn settings(credentials: &Path, token: &Path, scopes: &[&str]) -> Settings {
    Settings::new(credentials, token, scopes).unwrap()
}

pub fn send_and_readonly() -> Vec<&'static str> {
    vec![GMAIL_SEND, GMAIL_READONLY]
}

/// Write a desktop-app client secret pointing at the given token endpoint.
pub fn write_client_secret(path: &Path, token_uri: &str) {
    let content = format!(
        r#"{{"installed":{{"client_id":"test-client.apps.googleusercontent.com","project_id":"test","auth_uri":"https://accounts.example.test/o/oauth2/auth","token_uri":"{token_uri}","client_secret":"test-secret","redirect_uris":["http://localhost"]}}}}"#
    );
    std::fs::write(path, content).unwrap();
}

pub fn credential(
    token: &str,
    refresh_token: Option<&str>,
    scopes: &[&str],
    expiry: Option<DateTime<Utc>>,
) -> Credential {
    let mut json = serde_json::json!({
        "token": token,
        "token_uri": "https://oauth2.googleapis.com/token",
        "client_id": "test-client.apps.googleusercontent.com",
        "client_secret": "test-secret",
        "scopes": scopes,
    });
    if let Some(r) = refresh_token {
        json["refresh_token"] = serde_json::Value::String(r.to_string());
    }
    let mut cred: Credential = serde_json::from_value(json).unwrap();
    cred.expiry = expiry;
    cred
}

pub fn write_token(path: &Path, cred: &Credential) {
    std::fs::write(path, cred.to_json().unwrap()).unwrap();
}

pub fn in_one_hour() -> Option<DateTime<Utc>> {
    Some(Utc::now() + TimeDelta::seconds(3600))
}

pub fn an_hour_ago() -> Option<DateTime<Utc>> {
    Some(Utc::now() - TimeDelta::seconds(3600))
}

pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Authorizer stand-in that records every network-facing call.
pub struct MockAuthorizer {
    pub refresh_ok: bool,
    pub authorize_ok: bool,
    /// Scopes put on authorized credentials; None means "what was requested".
    pub grant: Option<Vec<String>>,
    pub calls: RefCell<Vec<&'static str>>,
}

impl Default for MockAuthorizer {
    fn default() -> Self {
        Self {
            refresh_ok: true,
            authorize_ok: true,
            grant: None,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl MockAuthorizer {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|c| **c == name).count()
    }
}

impl Authorizer for MockAuthorizer {
    fn refresh(&self, credential: &Credential) -> Result<Credential> {
        self.calls.borrow_mut().push("refresh");
        if !self.refresh_ok {
            return Err(AuthError::TokenEndpoint {
                status: 400,
                error: Some("invalid_grant".to_string()),
                description: Some("Token has been expired or revoked.".to_string()),
            });
        }
        let mut refreshed = credential.clone();
        refreshed.token = Some("refreshed-token".to_string());
        refreshed.expiry = in_one_hour();
        Ok(refreshed)
    }

    fn authorize(&self, secret: &ClientSecret, scopes: &[String]) -> Result<Credential> {
        self.calls.borrow_mut().push("authorize");
        if !self.authorize_ok {
            return Err(AuthError::AuthorizationDenied {
                error: "access_denied".to_string(),
                description: None,
            });
        }
        let granted = self.grant.clone().unwrap_or_else(|| scopes.to_vec());
        let granted: Vec<&str> = granted.iter().map(String::as_str).collect();
        let mut cred = credential("authorized-token", Some("authorized-refresh"), &granted, in_one_hour());
        cred.client_id = secret.client_id.clone();
        Ok(cred)
    }
}
