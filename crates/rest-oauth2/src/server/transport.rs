//! Router assembly and the unauthenticated informational endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{MatchedPath, Request, State},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{authorize, clients, middleware::bearer_auth, token, tokens};
use crate::config::Config;
use crate::grant::{GrantContext, GrantRegistry};
use crate::identity::LoginSession;
use crate::policy::Policy;

/// Path of the login-bound authorization endpoint.
pub const LOGIN_PATH: &str = "/oauth2/login";
/// Path of the token endpoint.
pub const TOKEN_PATH: &str = "/oauth2/access_token";
/// `action` value routing a login request to the authorization flow.
pub const AUTHORIZE_ACTION: &str = "oauth2_authorize";

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub config: Config,
    pub ctx: GrantContext,
    pub grants: GrantRegistry,
    pub session: Arc<dyn LoginSession>,
    pub policy: Arc<dyn Policy>,
}

impl HttpState {
    /// Absolute URL of the authorization endpoint.
    #[must_use]
    pub fn authorization_url(&self) -> String {
        self.config.url_for(&format!("{LOGIN_PATH}?action={AUTHORIZE_ACTION}"))
    }
}

/// Create the HTTP router.
pub fn create_router(state: Arc<HttpState>) -> Router {
    let api = Router::new()
        .route("/oauth2/tokens", get(tokens::list_tokens).post(tokens::create_personal_token))
        .route("/oauth2/tokens/{key}", delete(tokens::revoke_token))
        .route("/oauth2/clients", get(clients::list_clients).post(clients::create_client))
        .route(
            "/oauth2/clients/{id}",
            get(clients::get_client).put(clients::update_client).delete(clients::delete_client),
        )
        .route("/oauth2/clients/{id}/approve", post(clients::approve_client))
        .route("/oauth2/clients/{id}/regenerate-secret", post(clients::regenerate_secret))
        .route_layer(middleware::from_fn_with_state(Arc::clone(&state), bearer_auth));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route(LOGIN_PATH, get(authorize::handle_login_get).post(authorize::handle_login_post))
        .route("/oauth2/authorize", get(authorize::handle_authorize_redirect))
        .route(TOKEN_PATH, post(token::handle_token))
        .merge(api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

/// Request span with the route template instead of the URI, which can carry
/// token keys in the path or query.
fn request_span(request: &Request) -> tracing::Span {
    let route = request.extensions().get::<MatchedPath>().map_or("unmatched", MatchedPath::as_str);
    tracing::info_span!("request", method = %request.method(), route)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "rest-oauth2",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `GET /`
///
/// API index advertising the OAuth 2.0 endpoints.
async fn index(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "rest-oauth2",
        "url": state.config.base_url,
        "authentication": {
            "oauth2": {
                "endpoints": {
                    "authorization": state.authorization_url(),
                    "token": state.config.url_for(TOKEN_PATH),
                },
                "grant_types": state.grants.names(),
            }
        }
    }))
}
