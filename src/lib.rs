//! Obtain and cache a Google OAuth user credential for Gmail clients.

pub mod bootstrap;
pub mod cli;
pub mod client_secret;
pub mod config;
pub mod credential;
pub mod error;
pub mod logging;
pub mod oauth;
pub mod resolve;
pub mod status;
pub mod store;

pub use bootstrap::{Authorizer, Bootstrapper, CredentialSource, GoogleAuthorizer, Obtained};
pub use credential::Credential;
pub use error::{AuthError, Result};
