//! Offline report on the cached token.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::config::Settings;
use crate::error::Result;
use crate::store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStatus {
    pub path: PathBuf,
    pub found: bool,
    pub valid: bool,
    pub expired: bool,
    pub expiry: Option<DateTime<Utc>>,
    pub has_refresh_token: bool,
    pub scopes: Vec<String>,
    pub missing_scopes: Vec<String>,
}

/// Read the token file without touching the network or the file.
pub fn inspect(settings: &Settings) -> TokenStatus {
    let path = settings.token_file.clone();
    match store::load(&path) {
        Some(cred) => TokenStatus {
            found: true,
            valid: cred.is_valid(),
            expired: cred.is_expired(),
            expiry: cred.expiry,
            has_refresh_token: cred.can_refresh(),
            missing_scopes: cred.missing_scopes(&settings.scopes),
            scopes: cred.scopes,
            path,
        },
        None => TokenStatus {
            path,
            found: false,
            valid: false,
            expired: false,
            expiry: None,
            has_refresh_token: false,
            scopes: vec![],
            missing_scopes: settings.scopes.clone(),
        },
    }
}

pub fn render(status: &TokenStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Token file:     {}", status.path.display());
    if !status.found {
        let _ = writeln!(out, "State:          missing or unreadable");
        return out;
    }
    let state = if status.valid {
        "valid"
    } else if status.expired {
        "expired"
    } else {
        "invalid"
    };
    let _ = writeln!(out, "State:          {}", state);
    let expiry = status
        .expiry
        .map(|e| e.to_rfc3339())
        .unwrap_or_else(|| "none".to_string());
    let _ = writeln!(out, "Expiry:         {}", expiry);
    let _ = writeln!(
        out,
        "Refresh token:  {}",
        if status.has_refresh_token { "yes" } else { "no" }
    );
    let _ = writeln!(out, "Scopes:");
    for scope in &status.scopes {
        let _ = writeln!(out, "  {}", scope);
    }
    if status.missing_scopes.is_empty() {
        let _ = writeln!(out, "Requested scopes: covered");
    } else {
        let _ = writeln!(out, "Requested scopes: missing {}", status.missing_scopes.join(", "));
    }
    out
}

/// CLI: gmail-token status
pub fn run(settings: &Settings) -> Result<()> {
    print!("{}", render(&inspect(settings)));
    Ok(())
}
