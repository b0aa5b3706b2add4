//! Bearer token authentication for inbound API requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use axum::http::{HeaderMap, header};
use regex::Regex;
use url::form_urlencoded;

use crate::error::{OAuthError, OAuthResult};
use crate::identity::IdentityId;
use crate::models::AccessToken;
use crate::registry::ClientRegistry;
use crate::tokens::TokenStore;

/// The resolved credential of an authenticated request.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub identity: IdentityId,
    pub token: AccessToken,
}

/// Outcome of [`authenticate`].
#[derive(Debug, Clone)]
pub enum Authentication {
    Authenticated(Authenticated),
    /// No credential was presented, so another mechanism may decide.
    NoOpinion,
}

/// Request-scoped lock against resolving a token while already resolving one.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationGuard {
    resolving: Arc<AtomicBool>,
}

impl AuthenticationGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the guarded section. Returns `None` if it is already held.
    #[must_use]
    pub fn enter(&self) -> Option<GuardScope<'_>> {
        self.resolving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GuardScope { guard: self })
    }

    #[must_use]
    pub fn is_resolving(&self) -> bool {
        self.resolving.load(Ordering::Acquire)
    }
}

/// Releases the guard when dropped.
#[derive(Debug)]
pub struct GuardScope<'a> {
    guard: &'a AuthenticationGuard,
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        self.guard.resolving.store(false, Ordering::Release);
    }
}

fn bearer_regex() -> Option<&'static Regex> {
    static BEARER_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    BEARER_REGEX.get_or_init(|| Regex::new(r"Bearer ([a-zA-Z0-9\-._~+/=]+)").ok()).as_ref()
}

/// Token from an `Authorization: Bearer ...` value.
#[must_use]
pub fn bearer_from_header(value: &str) -> Option<&str> {
    bearer_regex()?.captures(value.trim())?.get(1).map(|m| m.as_str())
}

/// Find the presented token: the Authorization header first, then the
/// `access_token` query parameter.
#[must_use]
pub fn extract_token(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_from_header);
    if let Some(token) = from_header {
        return Some(token.to_owned());
    }

    let token = form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "access_token")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())?;
    tracing::warn!("Access token passed in the query string; use the Authorization header");
    Some(token)
}

/// Resolve the request's bearer token to an identity.
///
/// Unknown tokens and tokens whose client no longer exists are `InvalidToken`.
pub async fn authenticate(
    registry: &ClientRegistry,
    tokens: &TokenStore,
    headers: &HeaderMap,
    query: Option<&str>,
    guard: &AuthenticationGuard,
) -> OAuthResult<Authentication> {
    let Some(key) = extract_token(headers, query) else {
        return Ok(Authentication::NoOpinion);
    };
    let Some(_scope) = guard.enter() else {
        return Ok(Authentication::NoOpinion);
    };

    let token = match tokens.get_access_token(&key).await {
        Ok(token) => token,
        Err(OAuthError::TokenNotFound) => {
            tracing::warn!("Rejected unknown bearer token");
            return Err(OAuthError::InvalidToken);
        }
        Err(e) => return Err(e),
    };

    if registry.find(&token.client_id).await?.is_none() {
        tracing::warn!(client_id = %token.client_id, "Rejected token of a deleted client");
        return Err(OAuthError::InvalidToken);
    }

    Ok(Authentication::Authenticated(Authenticated { identity: token.identity.clone(), token }))
}
