//! Stateless anti-forgery tokens for the approval form.
//!
//! A nonce is an HMAC-SHA256 over `tick|action|identity`, where a tick is half
//! of the nonce lifetime. Nonces from the current and the previous tick verify.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::RngCore;
use ring::hmac;

use crate::identity::IdentityId;

/// Nonce lifetime in seconds.
pub const NONCE_LIFETIME: i64 = 86_400;

/// Action string binding a nonce to one client and response type.
#[must_use]
pub fn authorize_action(response_type: &str, client_id: &str) -> String {
    format!("oauth2_authorize:{response_type}:{client_id}")
}

/// Signs and verifies nonces with a server-side key.
#[derive(Clone)]
pub struct NonceSigner {
    key: hmac::Key,
}

impl NonceSigner {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self { key: hmac::Key::new(hmac::HMAC_SHA256, secret) }
    }

    /// Signer with a random per-process key. Nonces do not survive a restart.
    #[must_use]
    pub fn random() -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(&secret)
    }

    #[must_use]
    pub fn create(&self, action: &str, identity: &IdentityId) -> String {
        self.create_at(action, identity, Utc::now().timestamp())
    }

    #[must_use]
    pub fn verify(&self, nonce: &str, action: &str, identity: &IdentityId) -> bool {
        self.verify_at(nonce, action, identity, Utc::now().timestamp())
    }

    fn create_at(&self, action: &str, identity: &IdentityId, now: i64) -> String {
        let tag = hmac::sign(&self.key, &message(tick(now), action, identity));
        URL_SAFE_NO_PAD.encode(tag.as_ref())
    }

    fn verify_at(&self, nonce: &str, action: &str, identity: &IdentityId, now: i64) -> bool {
        let Ok(tag) = URL_SAFE_NO_PAD.decode(nonce) else {
            return false;
        };
        let current = tick(now);
        [current, current - 1]
            .into_iter()
            .any(|t| hmac::verify(&self.key, &message(t, action, identity), &tag).is_ok())
    }
}

impl std::fmt::Debug for NonceSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceSigner").finish_non_exhaustive()
    }
}

fn tick(now: i64) -> i64 {
    now.div_euclid(NONCE_LIFETIME / 2)
}

fn message(tick: i64, action: &str, identity: &IdentityId) -> Vec<u8> {
    format!("{tick}|{action}|{identity}").into_bytes()
}
