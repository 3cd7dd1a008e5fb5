use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;

#[derive(Parser)]
#[command(name = "gmail-token", version, about = "Authorize Gmail API access once and cache the OAuth token in token.json")]
pub struct Cli {
    /// Config file (default: .gmail-token.toml, then the user config dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Client secret downloaded from Google Cloud Console
    #[arg(long, value_name = "PATH", global = true)]
    pub credentials: Option<PathBuf>,

    /// Where the cached token is read from and written to
    #[arg(long, value_name = "PATH", global = true)]
    pub token: Option<PathBuf>,

    /// Scope to request; repeatable. Short names like gmail.send are expanded
    #[arg(long = "scope", value_name = "SCOPE", global = true)]
    pub scopes: Vec<String>,

    /// Loopback port for the redirect (0 picks a free port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Print the authorization URL instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,

    /// Consent screen behaviour
    #[arg(long, value_parser = ["none", "consent", "select_account"])]
    pub prompt: Option<String>,

    /// Email address to pre-fill on the sign-in page
    #[arg(long, value_name = "EMAIL")]
    pub login_hint: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the cached token's state without contacting Google
    Status,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            credentials: self.credentials.clone(),
            token: self.token.clone(),
            scopes: self.scopes.clone(),
            port: self.port,
            no_browser: self.no_browser,
            prompt: self.prompt.clone(),
            login_hint: self.login_hint.clone(),
        }
    }
}
