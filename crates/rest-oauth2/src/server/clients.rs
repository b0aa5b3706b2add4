//! Admin API for registered clients.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::middleware::RequireIdentity;
use super::transport::HttpState;
use crate::error::{OAuthError, OAuthResult};
use crate::identity::{IdentityId, Principal};
use crate::models::{Client, ClientStatus, ClientType};
use crate::policy::{Action, Resource};
use crate::registry::{ClientUpdate, NewClient};

/// Client representation returned by the admin API.
#[derive(Debug, Serialize)]
pub struct ClientView {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub client_type: ClientType,
    pub status: ClientStatus,
    pub redirect_uris: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub owner: Option<IdentityId>,
    pub created_at: DateTime<Utc>,
}

impl From<Client> for ClientView {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            description: client.description,
            client_type: client.client_type,
            status: client.status,
            redirect_uris: client.redirect_uris,
            secret: client.secret,
            owner: client.owner,
            created_at: client.created_at,
        }
    }
}

/// `GET /oauth2/clients`
///
/// Everything for client managers, otherwise the caller's own clients.
pub async fn list_clients(
    State(state): State<Arc<HttpState>>,
    RequireIdentity(principal): RequireIdentity,
) -> OAuthResult<impl IntoResponse> {
    let clients = if state.policy.can(&principal, Action::ManageClients, Resource::Clients) {
        state.ctx.registry.list().await?
    } else {
        state.ctx.registry.list_for_owner(&principal.id).await?
    };
    Ok(Json(clients.into_iter().map(ClientView::from).collect::<Vec<_>>()))
}

/// `POST /oauth2/clients`
pub async fn create_client(
    State(state): State<Arc<HttpState>>,
    RequireIdentity(principal): RequireIdentity,
    Json(body): Json<NewClient>,
) -> OAuthResult<impl IntoResponse> {
    if !state.policy.can(&principal, Action::ManageClients, Resource::Clients) {
        return Err(OAuthError::Forbidden);
    }
    let client = state.ctx.registry.create(body, &principal.id).await?;
    Ok((StatusCode::CREATED, Json(ClientView::from(client))))
}

/// `GET /oauth2/clients/{id}`
pub async fn get_client(
    State(state): State<Arc<HttpState>>,
    RequireIdentity(principal): RequireIdentity,
    Path(id): Path<String>,
) -> OAuthResult<impl IntoResponse> {
    let client = managed_client(&state, &principal, &id).await?;
    Ok(Json(ClientView::from(client)))
}

/// `PUT /oauth2/clients/{id}`
pub async fn update_client(
    State(state): State<Arc<HttpState>>,
    RequireIdentity(principal): RequireIdentity,
    Path(id): Path<String>,
    Json(body): Json<ClientUpdate>,
) -> OAuthResult<impl IntoResponse> {
    let client = managed_client(&state, &principal, &id).await?;
    let updated = state.ctx.registry.update(&client, body).await?;
    Ok(Json(ClientView::from(updated)))
}

/// `DELETE /oauth2/clients/{id}`
pub async fn delete_client(
    State(state): State<Arc<HttpState>>,
    RequireIdentity(principal): RequireIdentity,
    Path(id): Path<String>,
) -> OAuthResult<impl IntoResponse> {
    let client = managed_client(&state, &principal, &id).await?;
    let deleted = state.ctx.registry.delete(&client).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// `POST /oauth2/clients/{id}/approve`
pub async fn approve_client(
    State(state): State<Arc<HttpState>>,
    RequireIdentity(principal): RequireIdentity,
    Path(id): Path<String>,
) -> OAuthResult<impl IntoResponse> {
    let client = state.ctx.registry.get_by_id(&id).await?;
    if !state.policy.can(&principal, Action::ApproveClients, Resource::Client(&client)) {
        return Err(OAuthError::Forbidden);
    }
    let approved = state.ctx.registry.approve(&client).await?;
    Ok(Json(ClientView::from(approved)))
}

/// `POST /oauth2/clients/{id}/regenerate-secret`
pub async fn regenerate_secret(
    State(state): State<Arc<HttpState>>,
    RequireIdentity(principal): RequireIdentity,
    Path(id): Path<String>,
) -> OAuthResult<impl IntoResponse> {
    let client = managed_client(&state, &principal, &id).await?;
    let updated = state.ctx.registry.regenerate_secret(&client).await?;
    Ok(Json(ClientView::from(updated)))
}

async fn managed_client(state: &HttpState, principal: &Principal, id: &str) -> OAuthResult<Client> {
    let client = state.ctx.registry.get_by_id(id).await?;
    if !state.policy.can(principal, Action::ManageClients, Resource::Client(&client)) {
        return Err(OAuthError::Forbidden);
    }
    Ok(client)
}
