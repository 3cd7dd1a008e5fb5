//! Configuration: parse .gmail-token.toml and apply command-line overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AuthError, Result};
use crate::resolve;

/// Prefix Google uses for its API scope URIs.
pub const SCOPE_PREFIX: &str = "https://www.googleapis.com/auth/";

pub const GMAIL_READONLY: &str = "https://www.googleapis.com/auth/gmail.readonly";
pub const GMAIL_SEND: &str = "https://www.googleapis.com/auth/gmail.send";

/// On-disk configuration. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,
    #[serde(default = "default_token_file")]
    pub token_file: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_redirect_host")]
    pub redirect_host: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default = "default_open_browser")]
    pub open_browser: bool,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub login_hint: Option<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_credentials_file() -> String {
    "credentials.json".to_string()
}
fn default_token_file() -> String {
    "token.json".to_string()
}
fn default_scopes() -> Vec<String> {
    vec![GMAIL_READONLY.to_string()]
}
fn default_redirect_host() -> String {
    "localhost".to_string()
}
fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}
fn default_open_browser() -> bool {
    true
}
fn default_http_timeout_secs() -> u64 {
    30
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            credentials_file: default_credentials_file(),
            token_file: default_token_file(),
            scopes: default_scopes(),
            redirect_host: default_redirect_host(),
            bind_addr: default_bind_addr(),
            port: 0,
            open_browser: true,
            prompt: None,
            login_hint: None,
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Values given on the command line. `None`/empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub credentials: Option<PathBuf>,
    pub token: Option<PathBuf>,
    pub scopes: Vec<String>,
    pub port: Option<u16>,
    pub no_browser: bool,
    pub prompt: Option<String>,
    pub login_hint: Option<String>,
}

/// Loopback listener and authorization URL options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOptions {
    pub redirect_host: String,
    pub bind_addr: String,
    pub port: u16,
    pub open_browser: bool,
    pub prompt: Option<String>,
    pub login_hint: Option<String>,
}

impl Default for FlowOptions {
    fn default() -> Self {
        let cfg = FileConfig::default();
        Self {
            redirect_host: cfg.redirect_host,
            bind_addr: cfg.bind_addr,
            port: cfg.port,
            open_browser: cfg.open_browser,
            prompt: None,
            login_hint: None,
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
    pub scopes: Vec<String>,
    pub flow: FlowOptions,
    pub http_timeout: Duration,
}

impl Settings {
    /// Settings for explicit paths and scopes, with default flow options.
    pub fn new(credentials_file: &Path, token_file: &Path, scopes: &[&str]) -> Result<Self> {
        let scopes: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
        Ok(Self {
            credentials_file: credentials_file.to_path_buf(),
            token_file: token_file.to_path_buf(),
            scopes: normalize_scopes(&scopes)?,
            flow: FlowOptions::default(),
            http_timeout: Duration::from_secs(default_http_timeout_secs()),
        })
    }
}

/// Parse a config file. A missing file yields defaults.
pub fn load_file(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| AuthError::Config(format!("{}: {}", path.display(), e)))
}

/// Resolve settings from the config file (if any) and command-line overrides.
pub fn load(overrides: &Overrides) -> Result<Settings> {
    let file = match resolve::config_file(overrides.config.as_deref()) {
        Some(path) => {
            if overrides.config.is_some() && !path.exists() {
                return Err(AuthError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            tracing::debug!(path = %path.display(), "loading config");
            load_file(&path)?
        }
        None => FileConfig::default(),
    };
    apply(file, overrides)
}

/// Merge a parsed config with overrides. Overrides win.
pub fn apply(file: FileConfig, overrides: &Overrides) -> Result<Settings> {
    let credentials_file = match &overrides.credentials {
        Some(p) => p.clone(),
        None => resolve::expand_tilde(&file.credentials_file),
    };
    let token_file = match &overrides.token {
        Some(p) => p.clone(),
        None => resolve::expand_tilde(&file.token_file),
    };
    let raw_scopes = if overrides.scopes.is_empty() {
        &file.scopes
    } else {
        &overrides.scopes
    };
    if file.http_timeout_secs == 0 {
        return Err(AuthError::Config(
            "http_timeout_secs must be greater than zero".to_string(),
        ));
    }

    Ok(Settings {
        credentials_file,
        token_file,
        scopes: normalize_scopes(raw_scopes)?,
        flow: FlowOptions {
            redirect_host: file.redirect_host,
            bind_addr: file.bind_addr,
            port: overrides.port.unwrap_or(file.port),
            open_browser: file.open_browser && !overrides.no_browser,
            prompt: overrides.prompt.clone().or(file.prompt),
            login_hint: overrides.login_hint.clone().or(file.login_hint),
        },
        http_timeout: Duration::from_secs(file.http_timeout_secs),
    })
}

/// Expand short scope names and drop duplicates, keeping first occurrence.
///
/// `gmail.readonly` becomes `https://www.googleapis.com/auth/gmail.readonly`.
/// Anything containing `://` is kept verbatim.
pub fn normalize_scopes(raw: &[String]) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for scope in raw {
        let scope = scope.trim();
        if scope.is_empty() {
            continue;
        }
        let full = if scope.contains("://") {
            scope.to_string()
        } else {
            format!("{}{}", SCOPE_PREFIX, scope)
        };
        if !out.contains(&full) {
            out.push(full);
        }
    }
    if out.is_empty() {
        return Err(AuthError::Config("at least one scope is required".to_string()));
    }
    Ok(out)
}
