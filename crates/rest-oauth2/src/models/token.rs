//! Authorization codes and access tokens.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client::PERSONAL_CLIENT_ID;
use crate::identity::IdentityId;
use crate::pkce::CodeChallenge;

/// A short-lived, single-use authorization code.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub identity: IdentityId,
    pub redirect_uri: String,
    pub pkce: Option<CodeChallenge>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationCode {
    /// Check if the code has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationCode")
            .field("client_id", &self.client_id)
            .field("identity", &self.identity)
            .field("pkce", &self.pkce.as_ref().map(|p| p.method))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A bearer credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub key: String,
    pub identity: IdentityId,
    pub client_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl AccessToken {
    /// Human-readable name, set on personal tokens.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.meta.get("name").map(String::as_str)
    }

    #[must_use]
    pub fn is_personal(&self) -> bool {
        self.client_id == PERSONAL_CLIENT_ID
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("identity", &self.identity)
            .field("client_id", &self.client_id)
            .field("created_at", &self.created_at)
            .field("meta", &self.meta)
            .finish()
    }
}
