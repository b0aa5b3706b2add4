//! Profile API: list, create and revoke access tokens.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::middleware::RequireIdentity;
use super::transport::HttpState;
use crate::error::{OAuthError, OAuthResult};
use crate::identity::IdentityId;
use crate::models::{AccessToken, Client};
use crate::policy::{Action, Resource};

#[derive(Debug, Deserialize)]
pub struct TokensQuery {
    /// Whose tokens to act on; defaults to the caller.
    pub identity: Option<IdentityId>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub name: String,
}

/// Summary of the client a token was issued through.
#[derive(Debug, Serialize)]
pub struct AppSummary {
    pub id: String,
    pub name: String,
}

/// A token as listed on the profile.
#[derive(Debug, Serialize)]
pub struct TokenView {
    pub key: String,
    pub client_id: String,
    /// `None` when the issuing client has been deleted.
    pub app: Option<AppSummary>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub meta: BTreeMap<String, String>,
}

impl TokenView {
    fn new(token: AccessToken, client: Option<&Client>) -> Self {
        Self {
            name: token.name().map(str::to_owned),
            app: client.map(|c| AppSummary { id: c.id.clone(), name: c.name.clone() }),
            key: token.key,
            client_id: token.client_id,
            created_at: token.created_at,
            meta: token.meta,
        }
    }
}

/// `GET /oauth2/tokens`
pub async fn list_tokens(
    State(state): State<Arc<HttpState>>,
    RequireIdentity(principal): RequireIdentity,
    Query(query): Query<TokensQuery>,
) -> OAuthResult<impl IntoResponse> {
    let identity = query.identity.unwrap_or_else(|| principal.id.clone());
    if !state.policy.can(&principal, Action::ViewTokens, Resource::Identity(&identity)) {
        return Err(OAuthError::Forbidden);
    }

    let tokens = state.ctx.tokens.get_tokens_for_identity(&identity).await?;
    let mut views = Vec::with_capacity(tokens.len());
    for token in tokens {
        let client = state.ctx.registry.find(&token.client_id).await?;
        views.push(TokenView::new(token, client.as_ref()));
    }
    Ok(Json(views))
}

/// `POST /oauth2/tokens`
///
/// Mint a personal access token. The key is only shown in this response.
pub async fn create_personal_token(
    State(state): State<Arc<HttpState>>,
    RequireIdentity(principal): RequireIdentity,
    Query(query): Query<TokensQuery>,
    Json(body): Json<CreateTokenRequest>,
) -> OAuthResult<impl IntoResponse> {
    let identity = query.identity.unwrap_or_else(|| principal.id.clone());
    if !state.policy.can(&principal, Action::CreatePersonalToken, Resource::Identity(&identity)) {
        return Err(OAuthError::Forbidden);
    }

    let name = body.name.trim();
    if name.is_empty() {
        return Err(OAuthError::validation("name", "cannot be empty"));
    }

    let personal = Client::personal();
    let meta = BTreeMap::from([("name".to_owned(), name.to_owned())]);
    let token = state.ctx.tokens.create_access_token(&personal, &identity, meta).await?;
    Ok((StatusCode::CREATED, Json(TokenView::new(token, Some(&personal)))))
}

/// `DELETE /oauth2/tokens/{key}`
pub async fn revoke_token(
    State(state): State<Arc<HttpState>>,
    RequireIdentity(principal): RequireIdentity,
    Path(key): Path<String>,
) -> OAuthResult<impl IntoResponse> {
    let token = state.ctx.tokens.get_access_token(&key).await?;
    if !state.policy.can(&principal, Action::RevokeToken, Resource::Token(&token)) {
        return Err(OAuthError::Forbidden);
    }

    let revoked = state.ctx.tokens.revoke(&token).await?;
    Ok(Json(serde_json::json!({ "revoked": revoked })))
}
