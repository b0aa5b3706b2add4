//! Bearer authentication middleware and the principal extractor.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::transport::HttpState;
use crate::auth::{self, Authenticated, Authentication, AuthenticationGuard};
use crate::error::OAuthError;
use crate::identity::Principal;

/// Resolve a presented bearer token and attach it to the request.
///
/// Requests without a token pass through untouched; an invalid token is
/// rejected here with `invalid_token`.
pub async fn bearer_auth(
    State(state): State<Arc<HttpState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<Authenticated>().is_some() {
        return next.run(request).await;
    }

    let guard = request.extensions().get::<AuthenticationGuard>().cloned().unwrap_or_default();
    let outcome = auth::authenticate(
        &state.ctx.registry,
        &state.ctx.tokens,
        request.headers(),
        request.uri().query(),
        &guard,
    )
    .await;

    match outcome {
        Ok(Authentication::Authenticated(authenticated)) => {
            tracing::debug!(identity = %authenticated.identity, "Authenticated bearer token");
            request.extensions_mut().insert(authenticated);
        }
        Ok(Authentication::NoOpinion) => {}
        Err(e) => return e.into_response(),
    }

    request.extensions_mut().insert(guard);
    next.run(request).await
}

/// The principal making the request, from a bearer token or the login session.
///
/// Rejects with 401 when neither identifies a known principal.
#[derive(Debug, Clone)]
pub struct RequireIdentity(pub Principal);

impl FromRequestParts<Arc<HttpState>> for RequireIdentity {
    type Rejection = OAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<HttpState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = match parts.extensions.get::<Authenticated>() {
            Some(authenticated) => Some(authenticated.identity.clone()),
            None => state.session.current_identity(&parts.headers),
        };
        let Some(identity) = identity else {
            return Err(OAuthError::Unauthenticated);
        };

        state
            .ctx
            .tokens
            .identities()
            .resolve(&identity)
            .await
            .map(Self)
            .ok_or(OAuthError::Unauthenticated)
    }
}
