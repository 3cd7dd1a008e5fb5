//! Produce a usable credential: reuse the cached token, refresh it, or run
//! the consent flow, then persist whatever changed.

use chrono::Utc;

use crate::client_secret::ClientSecret;
use crate::config::Settings;
use crate::credential::Credential;
use crate::error::{AuthError, Result};
use crate::oauth::flow::{BrowserPresenter, InstalledFlow, Presenter};
use crate::oauth::token_endpoint::TokenClient;
use crate::store;

/// The two network-facing steps of the bootstrap.
pub trait Authorizer {
    /// Exchange the credential's refresh token for a new access token.
    fn refresh(&self, credential: &Credential) -> Result<Credential>;

    /// Run the interactive consent flow.
    fn authorize(&self, secret: &ClientSecret, scopes: &[String]) -> Result<Credential>;
}

/// Talks to Google: token endpoint over HTTPS, consent through the browser.
pub struct GoogleAuthorizer<P: Presenter = BrowserPresenter> {
    client: TokenClient,
    flow: InstalledFlow<P>,
}

impl GoogleAuthorizer<BrowserPresenter> {
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            TokenClient::new(settings.http_timeout),
            InstalledFlow::with_browser(settings.flow.clone()),
        )
    }
}

impl<P: Presenter> GoogleAuthorizer<P> {
    pub fn new(client: TokenClient, flow: InstalledFlow<P>) -> Self {
        Self { client, flow }
    }
}

impl<P: Presenter> Authorizer for GoogleAuthorizer<P> {
    fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let response = self.client.refresh(credential)?;
        let mut refreshed = credential.clone();
        refreshed.apply_refresh(&response, Utc::now())?;
        Ok(refreshed)
    }

    fn authorize(&self, secret: &ClientSecret, scopes: &[String]) -> Result<Credential> {
        self.flow.run(&self.client, secret, scopes)
    }
}

/// Where the returned credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from the token file, still valid. Nothing was written.
    Cached,
    /// Loaded, refreshed and saved.
    Refreshed,
    /// Obtained through the consent flow and saved.
    Authorized,
}

#[derive(Debug, Clone)]
pub struct Obtained {
    pub credential: Credential,
    pub source: CredentialSource,
}

pub struct Bootstrapper<A: Authorizer> {
    settings: Settings,
    authorizer: A,
}

impl<A: Authorizer> Bootstrapper<A> {
    pub fn new(settings: Settings, authorizer: A) -> Self {
        Self {
            settings,
            authorizer,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn authorizer(&self) -> &A {
        &self.authorizer
    }

    /// One pass of the decision sequence. At most one refresh and at most one
    /// consent flow are attempted; the token file is only written once a
    /// complete credential exists.
    pub fn obtain_credential(&self) -> Result<Obtained> {
        let token_file = &self.settings.token_file;
        let scopes = &self.settings.scopes;

        let cached = store::load(token_file);
        if cached.is_some() {
            println!("Loaded credentials from existing file: {}", token_file.display());
        }

        match cached {
            Some(cred) if !cred.has_scopes(scopes) => {
                tracing::debug!(missing = ?cred.missing_scopes(scopes), "cached scopes differ");
                println!("Stored credentials do not cover the requested scopes. Starting authorization flow...");
            }
            Some(cred) if cred.is_valid() => {
                tracing::debug!("cached credential is valid");
                return Ok(Obtained {
                    credential: cred,
                    source: CredentialSource::Cached,
                });
            }
            Some(cred) if cred.is_expired() && cred.can_refresh() => {
                println!("Credentials have expired. Refreshing token...");
                match self.authorizer.refresh(&cred) {
                    Ok(refreshed) => {
                        self.persist(&refreshed)?;
                        return Ok(Obtained {
                            credential: refreshed,
                            source: CredentialSource::Refreshed,
                        });
                    }
                    Err(e) => {
                        tracing::warn!("token refresh failed: {}", e);
                        eprintln!("Error refreshing token: {}", e);
                        eprintln!("Could not refresh token. Please re-authorize.");
                    }
                }
            }
            _ => {
                println!("No valid credentials found. Starting authorization flow...");
            }
        }

        let credential = self.authorize()?;
        self.persist(&credential)?;
        Ok(Obtained {
            credential,
            source: CredentialSource::Authorized,
        })
    }

    fn authorize(&self) -> Result<Credential> {
        let secret = ClientSecret::from_file(&self.settings.credentials_file)?;
        if self.settings.flow.open_browser {
            println!("A browser window will now open for you to log in and authorize the application.");
        }
        println!("Please complete the authorization in your browser.");

        let credential = self.authorizer.authorize(&secret, &self.settings.scopes)?;
        let missing = credential.missing_scopes(&self.settings.scopes);
        if !missing.is_empty() {
            return Err(AuthError::ScopesNotGranted(missing));
        }
        Ok(credential)
    }

    fn persist(&self, credential: &Credential) -> Result<()> {
        store::save(&self.settings.token_file, credential)?;
        println!("Credentials saved to {}", self.settings.token_file.display());
        Ok(())
    }
}
