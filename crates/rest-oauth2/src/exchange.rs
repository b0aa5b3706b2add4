//! Authorization code exchange behind the token endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{OAuthError, OAuthResult};
use crate::redirect;
use crate::registry::ClientRegistry;
use crate::tokens::TokenStore;

/// The only grant the token endpoint accepts.
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";

/// Form body of a token request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code: Option<String>,
    pub code_verifier: Option<String>,
    /// Must match the code's redirect URI when present.
    pub redirect_uri: Option<String>,
}

/// Client credentials taken from HTTP Basic authentication.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials").field("client_id", &self.client_id).finish()
    }
}

/// Successful token response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Exchange an authorization code for an access token.
///
/// Basic credentials take precedence over `client_id`/`client_secret` in the body.
pub async fn exchange(
    registry: &ClientRegistry,
    tokens: &TokenStore,
    request: TokenRequest,
    basic: Option<ClientCredentials>,
) -> OAuthResult<TokenResponse> {
    match non_empty(request.grant_type) {
        Some(grant) if grant == GRANT_AUTHORIZATION_CODE => {}
        Some(grant) => return Err(OAuthError::UnsupportedGrantType(grant)),
        None => return Err(OAuthError::MissingParameter("grant_type")),
    }

    let (client_id, client_secret) = match basic {
        Some(creds) => (Some(creds.client_id), Some(creds.client_secret)),
        None => (request.client_id, request.client_secret),
    };
    let client_id = non_empty(client_id).ok_or(OAuthError::MissingParameter("client_id"))?;
    let code = non_empty(request.code).ok_or(OAuthError::MissingParameter("code"))?;

    let client = registry
        .find(&client_id)
        .await?
        .filter(|c| !c.is_personal())
        .ok_or_else(|| OAuthError::InvalidClient(client_id.clone()))?;

    if client.requires_secret() {
        let Some(secret) = non_empty(client_secret) else {
            return Err(OAuthError::SecretRequired);
        };
        if !ClientRegistry::check_secret(&client, &secret) {
            tracing::warn!(client_id = %client.id, "Rejected client secret");
            return Err(OAuthError::InvalidSecret);
        }
    }

    let redeemed = tokens.redeem(&client, &code).await?;

    let issued_for = std::slice::from_ref(&redeemed.redirect_uri);
    if non_empty(request.redirect_uri).is_some_and(|uri| !redirect::matches_any(issued_for, &uri)) {
        tracing::warn!(client_id = %client.id, "Rejected mismatched redirect URI");
        return Err(OAuthError::RedirectUriMismatch);
    }

    if let Some(pkce) = &redeemed.pkce {
        let Some(verifier) = non_empty(request.code_verifier) else {
            return Err(OAuthError::MissingCodeVerifier);
        };
        if !pkce.verify(&verifier) {
            tracing::warn!(client_id = %client.id, method = %pkce.method, "Rejected code verifier");
            return Err(OAuthError::InvalidCodeVerifier);
        }
    }

    let token = tokens.create_access_token(&client, &redeemed.identity, BTreeMap::new()).await?;
    Ok(TokenResponse { access_token: token.key, token_type: "bearer" })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
