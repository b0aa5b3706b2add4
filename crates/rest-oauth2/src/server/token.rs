//! Token endpoint handler.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};

use super::transport::HttpState;
use crate::error::OAuthError;
use crate::exchange::{self, ClientCredentials, TokenRequest, TokenResponse};

/// `POST /oauth2/access_token`
///
/// Exchange an authorization code for an access token. Client credentials are
/// read from HTTP Basic authentication when present, else from the form body.
pub async fn handle_token(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::warn!(reason = %rejection.body_text(), "Token request body rejected");
            return OAuthError::MalformedRequest(rejection.body_text()).into_response();
        }
    };
    let basic = headers.typed_get::<Authorization<Basic>>().map(|auth| ClientCredentials {
        client_id: auth.username().to_owned(),
        client_secret: auth.password().to_owned(),
    });

    match exchange::exchange(&state.ctx.registry, &state.ctx.tokens, form, basic).await {
        Ok(token) => token_success(&token),
        Err(e) => {
            if e.is_client_error() {
                tracing::warn!(code = e.code(), "Token request rejected");
            }
            e.into_response()
        }
    }
}

/// Build a token response with required OAuth 2.0 cache headers (RFC 6749 §5.1).
fn token_success(token: &TokenResponse) -> Response {
    let mut response = Json(token).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
