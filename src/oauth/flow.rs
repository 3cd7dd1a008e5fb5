//! Installed-application consent flow with a loopback redirect.

use chrono::Utc;

use super::callback::{CallbackListener, CallbackPayload};
use super::pkce::{PkcePair, generate_state};
use super::token_endpoint::TokenClient;
use crate::client_secret::ClientSecret;
use crate::config::FlowOptions;
use crate::credential::Credential;
use crate::error::{AuthError, Result};

/// Shows the authorization URL to the user.
pub trait Presenter {
    fn present(&self, url: &str) -> Result<()>;
}

/// Prints the URL and opens it in the default browser.
pub struct BrowserPresenter {
    pub open_browser: bool,
}

impl Presenter for BrowserPresenter {
    fn present(&self, url: &str) -> Result<()> {
        println!("Please visit this URL to authorize this application:");
        println!("  {}", url);
        if self.open_browser {
            // The printed URL still works when no browser can be launched.
            if let Err(e) = open::that(url) {
                tracing::warn!("could not open browser: {}", e);
                eprintln!("Could not open a browser ({}). Open the URL above manually.", e);
            }
        }
        Ok(())
    }
}

pub struct InstalledFlow<P: Presenter> {
    options: FlowOptions,
    presenter: P,
}

impl InstalledFlow<BrowserPresenter> {
    pub fn with_browser(options: FlowOptions) -> Self {
        let presenter = BrowserPresenter {
            open_browser: options.open_browser,
        };
        Self::new(options, presenter)
    }
}

impl<P: Presenter> InstalledFlow<P> {
    pub fn new(options: FlowOptions, presenter: P) -> Self {
        Self { options, presenter }
    }

    /// Run the consent flow and exchange the resulting code.
    ///
    /// Blocks until the browser hits the redirect URI.
    pub fn run(
        &self,
        client: &TokenClient,
        secret: &ClientSecret,
        scopes: &[String],
    ) -> Result<Credential> {
        let pkce = PkcePair::generate();
        let state = generate_state();

        let (payload, redirect_uri) = {
            let listener = CallbackListener::bind(&self.options.bind_addr, self.options.port)?;
            let redirect_uri = format!(
                "http://{}:{}/",
                self.options.redirect_host,
                listener.port()
            );
            let url = authorization_url(
                secret,
                &redirect_uri,
                scopes,
                &state,
                &pkce.code_challenge,
                &self.options,
            )?;
            self.presenter.present(&url)?;
            let payload = listener.wait()?;
            (payload, redirect_uri)
        };
        tracing::debug!("callback received, listener closed");

        let code = authorization_code(payload, &state)?;
        let response = client.exchange_code(secret, &code, &redirect_uri, &pkce.code_verifier)?;

        let missing = response.ungranted(scopes);
        if !missing.is_empty() {
            return Err(AuthError::ScopesNotGranted(missing));
        }

        Credential::from_token_response(secret, scopes, &response, Utc::now())
    }
}

/// Build the provider authorization URL.
pub fn authorization_url(
    secret: &ClientSecret,
    redirect_uri: &str,
    scopes: &[String],
    state: &str,
    code_challenge: &str,
    options: &FlowOptions,
) -> Result<String> {
    let mut url = url::Url::parse(&secret.auth_uri)
        .map_err(|e| AuthError::Config(format!("invalid auth_uri {:?}: {}", secret.auth_uri, e)))?;
    {
        let mut q = url.query_pairs_mut();
        q.append_pair("response_type", "code")
            .append_pair("client_id", &secret.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &scopes.join(" "))
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        if let Some(prompt) = &options.prompt {
            q.append_pair("prompt", prompt);
        }
        if let Some(hint) = &options.login_hint {
            q.append_pair("login_hint", hint);
        }
    }
    Ok(url.into())
}

/// Validate the redirect and pull out the authorization code.
pub fn authorization_code(payload: CallbackPayload, expected_state: &str) -> Result<String> {
    if let Some(error) = payload.error {
        if payload.state.is_none() || payload.state.as_deref() == Some(expected_state) {
            return Err(AuthError::AuthorizationDenied {
                error,
                description: payload.error_description,
            });
        }
        return Err(AuthError::StateMismatch);
    }
    if payload.state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    payload
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AuthError::Callback("redirect carried no authorization code".to_string()))
}
