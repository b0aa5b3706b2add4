//! Identity collaborators: the user directory and the login session.
//!
//! The server never owns user records. It resolves opaque identity ids through
//! an [`IdentityDirectory`] and learns who is logged in from a [`LoginSession`].

use std::collections::HashMap;
use std::fmt;

use axum::http::{HeaderMap, HeaderName};
use serde::{Deserialize, Serialize};
use url::Url;

/// Opaque resource-owner identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for IdentityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A resolved resource owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: IdentityId,
    pub display_name: String,
    pub is_admin: bool,
}

impl Principal {
    #[must_use]
    pub fn new(id: impl Into<IdentityId>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: display_name.into(), is_admin: false }
    }

    #[must_use]
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// Resolves identity ids to principals.
#[async_trait::async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn resolve(&self, id: &IdentityId) -> Option<Principal>;
}

/// Fixed in-memory directory, for standalone deployments and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticDirectory {
    principals: HashMap<IdentityId, Principal>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principals.insert(principal.id.clone(), principal);
        self
    }

    /// Parse a comma-separated list of `id[:admin]` entries.
    #[must_use]
    pub fn parse(entries: &str) -> Self {
        entries
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .fold(Self::new(), |dir, entry| {
                let (id, role) = entry.split_once(':').unwrap_or((entry, ""));
                let principal = Principal::new(id, id);
                let principal =
                    if role.eq_ignore_ascii_case("admin") { principal.admin() } else { principal };
                dir.with_principal(principal)
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for StaticDirectory {
    async fn resolve(&self, id: &IdentityId) -> Option<Principal> {
        self.principals.get(id).cloned()
    }
}

/// Tells the authorization endpoint who is logged in.
pub trait LoginSession: Send + Sync {
    /// Identity of the logged-in resource owner, if any.
    fn current_identity(&self, headers: &HeaderMap) -> Option<IdentityId>;

    /// Where to send an anonymous user; `redirect_to` is replayed after login.
    fn login_url(&self, redirect_to: &str) -> String;
}

/// Session established by a fronting proxy that sets a trusted header.
#[derive(Debug, Clone)]
pub struct HeaderSession {
    header: HeaderName,
    login_url: String,
}

impl HeaderSession {
    #[must_use]
    pub fn new(header: HeaderName, login_url: impl Into<String>) -> Self {
        Self { header, login_url: login_url.into() }
    }
}

impl LoginSession for HeaderSession {
    fn current_identity(&self, headers: &HeaderMap) -> Option<IdentityId> {
        headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(IdentityId::from)
    }

    fn login_url(&self, redirect_to: &str) -> String {
        with_redirect_to(&self.login_url, redirect_to)
    }
}

/// No login session: every request is anonymous unless it carries a bearer token.
#[derive(Debug, Clone)]
pub struct NoSession {
    login_url: String,
}

impl NoSession {
    #[must_use]
    pub fn new(login_url: impl Into<String>) -> Self {
        Self { login_url: login_url.into() }
    }
}

impl LoginSession for NoSession {
    fn current_identity(&self, _headers: &HeaderMap) -> Option<IdentityId> {
        None
    }

    fn login_url(&self, redirect_to: &str) -> String {
        with_redirect_to(&self.login_url, redirect_to)
    }
}

fn with_redirect_to(login_url: &str, redirect_to: &str) -> String {
    match Url::parse(login_url) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("redirect_to", redirect_to);
            url.into()
        }
        Err(_) => {
            let encoded: String =
                url::form_urlencoded::byte_serialize(redirect_to.as_bytes()).collect();
            let sep = if login_url.contains('?') { '&' } else { '?' };
            format!("{login_url}{sep}redirect_to={encoded}")
        }
    }
}
