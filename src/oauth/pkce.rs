//! PKCE verifier/challenge generation and the `state` nonce.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};

const STATE_LEN: usize = 30;

#[derive(Debug, Clone)]
pub struct PkcePair {
    pub code_verifier: String,
    pub code_challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let mut random = [0u8; 64];
        rand::thread_rng().fill_bytes(&mut random);

        let code_verifier = URL_SAFE_NO_PAD.encode(random);
        let code_challenge = code_challenge_s256(&code_verifier);

        Self {
            code_verifier,
            code_challenge,
        }
    }
}

pub fn code_challenge_s256(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Random alphanumeric `state` value for the authorization request.
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}
