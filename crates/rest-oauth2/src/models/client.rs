//! Registered application records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::IdentityId;

/// Id of the built-in client that owns personal access tokens.
pub const PERSONAL_CLIENT_ID: &str = "__personal_access_token";

/// Whether the client can keep a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// Browser or mobile app; relies on PKCE.
    Public,
    /// Server-side app; authenticates with its secret.
    Private,
}

impl ClientType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(format!("unknown client type '{other}'")),
        }
    }
}

/// Admin approval state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Draft,
    Published,
}

/// An OAuth client application.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub secret: Option<String>,
    pub client_type: ClientType,
    pub redirect_uris: Vec<String>,
    pub name: String,
    pub description: String,
    pub status: ClientStatus,
    pub owner: Option<IdentityId>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// The Personal Client singleton.
    #[must_use]
    pub fn personal() -> Self {
        Self {
            id: PERSONAL_CLIENT_ID.to_owned(),
            secret: None,
            client_type: ClientType::Private,
            redirect_uris: Vec::new(),
            name: "Personal Access Token".to_owned(),
            description: "Personal access token manually created by the user.".to_owned(),
            status: ClientStatus::Published,
            owner: None,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[must_use]
    pub fn is_personal(&self) -> bool {
        self.id == PERSONAL_CLIENT_ID
    }

    /// Whether the client may be used to authenticate end users.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_personal() || self.status == ClientStatus::Published
    }

    /// Confidential clients must authenticate at the token endpoint.
    #[must_use]
    pub fn requires_secret(&self) -> bool {
        !self.is_personal() && self.client_type == ClientType::Private
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("client_type", &self.client_type)
            .field("redirect_uris", &self.redirect_uris)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("owner", &self.owner)
            .finish()
    }
}
