//! OAuth 2.0 installed-application flow against Google.
//!
//! - `pkce`: verifier/challenge pairs and the anti-forgery `state`
//! - `token_endpoint`: blocking client for code exchange and refresh
//! - `callback`: one-shot loopback listener that catches the redirect
//! - `flow`: ties the above together behind the browser consent step

pub mod callback;
pub mod flow;
pub mod pkce;
pub mod token_endpoint;
