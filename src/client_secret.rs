//! Provider-issued client secret (`credentials.json`).
//!
//! Google ships these as `{"installed": {...}}` for desktop apps and
//! `{"web": {...}}` for web apps. Both carry the same keys.

use serde::Deserialize;
use std::path::Path;

use crate::error::{AuthError, Result};

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}
fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct SecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    /// Read a client secret file. A missing file is its own error so callers
    /// can tell the user where to download one.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AuthError::MissingClientSecret(path.to_path_buf()));
        }
        let data = std::fs::read(path)?;
        Self::from_slice(&data).map_err(|reason| AuthError::InvalidClientSecret {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_slice(data: &[u8]) -> std::result::Result<Self, String> {
        let file: SecretFile = serde_json::from_slice(data).map_err(|e| e.to_string())?;
        let secret = match (file.installed, file.web) {
            (Some(s), None) | (None, Some(s)) => s,
            (None, None) => {
                return Err("expected an \"installed\" or \"web\" section".to_string());
            }
            (Some(_), Some(_)) => {
                return Err("both \"installed\" and \"web\" sections present".to_string());
            }
        };
        if secret.client_id.trim().is_empty() {
            return Err("client_id is empty".to_string());
        }
        Ok(secret)
    }
}
