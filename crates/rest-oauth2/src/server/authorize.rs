//! Authorization endpoint handlers.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use super::pages;
use super::transport::{AUTHORIZE_ACTION, HttpState};
use crate::error::OAuthError;
use crate::grant::{AuthorizationOutcome, AuthorizationRequest, DecisionForm};

/// Query string of `/oauth2/login`.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub action: Option<String>,
    #[serde(flatten)]
    pub request: AuthorizationRequest,
}

/// `GET /oauth2/login?action=oauth2_authorize`
pub async fn handle_login_get(
    State(state): State<Arc<HttpState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    authorize(&state, &uri, &headers, &query, None).await
}

/// `POST /oauth2/login?action=oauth2_authorize`
///
/// Carries the resource owner's decision in the form body.
pub async fn handle_login_post(
    State(state): State<Arc<HttpState>>,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
    Form(form): Form<DecisionForm>,
) -> Response {
    authorize(&state, &uri, &headers, &query, Some(&form)).await
}

async fn authorize(
    state: &HttpState,
    uri: &Uri,
    headers: &HeaderMap,
    query: &LoginQuery,
    form: Option<&DecisionForm>,
) -> Response {
    if query.action.as_deref() != Some(AUTHORIZE_ACTION) {
        return error_page(&OAuthError::InvalidAction);
    }

    let grant = query
        .request
        .response_type
        .as_deref()
        .and_then(|response_type| state.grants.for_response_type(response_type));
    let Some(grant) = grant else {
        return error_page(&OAuthError::InvalidResponseType);
    };

    let request_url =
        state.config.url_for(uri.path_and_query().map_or(uri.path(), |pq| pq.as_str()));
    let login_url = state.session.login_url(&request_url);
    let identity = state.session.current_identity(headers);

    let outcome = grant
        .handle_authorization_request(&state.ctx, &query.request, form, identity.as_ref(), &login_url)
        .await;

    match outcome {
        Ok(AuthorizationOutcome::Redirect(location)) => found(&location),
        Ok(AuthorizationOutcome::LoginRequired(location)) => {
            tracing::debug!("Authorization requires login");
            found(&location)
        }
        Ok(AuthorizationOutcome::RenderForm(pending)) => {
            let principal_name = match &identity {
                Some(id) => match state.ctx.tokens.identities().resolve(id).await {
                    Some(principal) => principal.display_name,
                    None => id.to_string(),
                },
                None => String::new(),
            };
            let action_url = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());
            Html(pages::render_authorize_page(&pending, &principal_name, action_url))
                .into_response()
        }
        Err(e) => {
            if e.is_client_error() {
                tracing::warn!(code = e.code(), "Authorization request rejected");
            }
            error_page(&e)
        }
    }
}

/// `GET /oauth2/authorize`
///
/// Forward to the login-bound authorization endpoint with the same query.
pub async fn handle_authorize_redirect(State(state): State<Arc<HttpState>>, uri: Uri) -> Response {
    let mut url = state.authorization_url();
    if let Some(query) = uri.query().filter(|q| !q.is_empty()) {
        url.push('&');
        url.push_str(query);
    }
    (StatusCode::FOUND, [(header::LOCATION, url.clone())], Json(serde_json::json!({ "url": url })))
        .into_response()
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}

fn error_page(error: &OAuthError) -> Response {
    let status = error.status();
    if status.is_server_error() {
        tracing::error!(error = %error, "Authorization request failed");
    }
    (status, Html(pages::render_error_page(error.code(), &error.to_string()))).into_response()
}
