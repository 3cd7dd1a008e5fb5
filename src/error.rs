//! Error taxonomy for the token bootstrapper.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "client secret file not found at {}.\n\
         Download it from Google Cloud Console → APIs & Services → Credentials → \
         your Desktop app → Download JSON, and save it as {}.",
        .0.display(),
        .0.display()
    )]
    MissingClientSecret(PathBuf),

    #[error("invalid client secret file {}: {reason}", .path.display())]
    InvalidClientSecret { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not start local callback listener on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("authorization callback failed: {0}")]
    Callback(String),

    #[error("authorization callback state does not match the request")]
    StateMismatch,

    #[error("authorization denied: {error}{}", suffix(" (", .description, ")"))]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    #[error("token endpoint returned HTTP {status}{}{}", suffix(": ", .error, ""), suffix(" (", .description, ")"))]
    TokenEndpoint {
        status: u16,
        error: Option<String>,
        description: Option<String>,
    },

    #[error("request to token endpoint failed: {0}")]
    Http(String),

    #[error("token endpoint response is invalid: {0}")]
    InvalidTokenResponse(String),

    #[error("requested scopes were not granted: {}", .0.join(", "))]
    ScopesNotGranted(Vec<String>),

    #[error("credential has no refresh token")]
    NoRefreshToken,

    #[error("could not save credential to {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn suffix(open: &str, value: &Option<String>, close: &str) -> String {
    match value {
        Some(v) => format!("{open}{v}{close}"),
        None => String::new(),
    }
}

impl From<ureq::Error> for AuthError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                let (error, description) = crate::oauth::token_endpoint::parse_error_body(&body);
                AuthError::TokenEndpoint {
                    status,
                    error,
                    description,
                }
            }
            ureq::Error::Transport(transport) => AuthError::Http(transport.to_string()),
        }
    }
}
