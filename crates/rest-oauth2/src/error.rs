//! Error types for the OAuth 2.0 server.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Every protocol error carries a stable snake_case code and an HTTP status.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::pkce::PkceError;

/// Errors from the persistence collaborator.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record with the same key already exists.
    #[error("{kind} already exists")]
    Conflict {
        /// Record kind (client, token, code)
        kind: &'static str,
    },

    /// The record to update does not exist.
    #[error("{kind} does not exist")]
    Missing {
        /// Record kind (client, token, code)
        kind: &'static str,
    },

    /// The storage engine rejected the operation.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub const fn conflict(kind: &'static str) -> Self {
        Self::Conflict { kind }
    }

    #[must_use]
    pub const fn missing(kind: &'static str) -> Self {
        Self::Missing { kind }
    }
}

/// Errors from the authorization and token protocol engine.
#[derive(thiserror::Error, Debug)]
pub enum OAuthError {
    /// `client_id` absent from an authorization request
    #[error("Missing client_id parameter.")]
    MissingClientId,

    /// Unknown client at the authorization endpoint
    #[error("Client ID {0} is invalid.")]
    InvalidClientId(String),

    /// Client still in draft status
    #[error("Client {0} has not been approved.")]
    UnapprovedClient(String),

    /// No redirect URI supplied and none can be inferred
    #[error("Redirect URI was required, but not found.")]
    MissingRedirectUri,

    /// Supplied redirect URI does not match a registered one
    #[error("Specified redirect URI is not valid for this client.")]
    InvalidRedirectUri,

    /// PKCE parameters failed validation
    #[error("{0}")]
    Pkce(#[from] PkceError),

    /// No grant type handles the requested `response_type`
    #[error("Invalid response type specified.")]
    InvalidResponseType,

    /// Anti-forgery token did not verify
    #[error("Invalid nonce.")]
    InvalidNonce,

    /// Unknown approval form action
    #[error("Invalid form action.")]
    InvalidAction,

    /// Required token-endpoint parameter missing
    #[error("Missing {0} parameter.")]
    MissingParameter(&'static str),

    /// Token request body could not be read as a form
    #[error("Malformed token request: {0}")]
    MalformedRequest(String),

    /// Token endpoint only supports `authorization_code`
    #[error("Grant type {0} is not supported.")]
    UnsupportedGrantType(String),

    /// Unknown client at the token endpoint
    #[error("Client ID {0} is invalid.")]
    InvalidClient(String),

    /// Confidential client omitted its secret
    #[error("Secret is required for confidential clients.")]
    SecretRequired,

    /// Confidential client presented the wrong secret
    #[error("Supplied secret is not valid for the client.")]
    InvalidSecret,

    /// Authorization code not found for the client
    #[error("Authorization code is not valid for the specified client.")]
    InvalidCode,

    /// Token request `redirect_uri` differs from the one the code was issued for
    #[error("Redirect URI does not match the authorization request.")]
    RedirectUriMismatch,

    /// Authorization code past its expiry
    #[error("Authorization code has expired.")]
    ExpiredCode,

    /// Code was issued with a PKCE challenge but no verifier was sent
    #[error("Missing code_verifier parameter.")]
    MissingCodeVerifier,

    /// Verifier does not match the stored challenge
    #[error("Supplied code_verifier is not valid for the authorization code.")]
    InvalidCodeVerifier,

    /// Identity cannot be resolved by the directory
    #[error("Invalid user to create token for.")]
    InvalidIdentity,

    /// Presented bearer token does not resolve
    #[error("Supplied token is invalid.")]
    InvalidToken,

    /// Malformed client or token field
    #[error("Invalid value for '{field}': {message}")]
    Validation {
        /// Field that failed validation
        field: &'static str,
        /// Validation error message
        message: String,
    },

    /// Client lookup miss outside the protocol endpoints
    #[error("Client {0} not found.")]
    ClientNotFound(String),

    /// Token lookup miss
    #[error("Token not found.")]
    TokenNotFound,

    /// Operation the Personal Client cannot perform
    #[error("Personal access tokens {0}.")]
    PersonalClient(&'static str),

    /// No principal on the request
    #[error("Authentication is required.")]
    Unauthenticated,

    /// Principal lacks the required permission
    #[error("Sorry, you are not allowed to do that.")]
    Forbidden,

    /// Persistence failure
    #[error("Could not save: {0}")]
    Storage(#[from] StoreError),
}

impl OAuthError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }

    /// Stable error code for API consumers.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingClientId => "missing_client_id",
            Self::InvalidClientId(_) => "invalid_client_id",
            Self::UnapprovedClient(_) => "unapproved_client",
            Self::MissingRedirectUri => "missing_redirect_uri",
            Self::InvalidRedirectUri => "invalid_redirect_uri",
            Self::Pkce(e) => e.code(),
            Self::InvalidResponseType => "invalid_response_type",
            Self::InvalidNonce => "invalid_nonce",
            Self::InvalidAction => "invalid_action",
            Self::MissingParameter(_) | Self::MalformedRequest(_) => "invalid_request",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::InvalidClient(_) => "invalid_client",
            Self::SecretRequired => "secret_required",
            Self::InvalidSecret => "invalid_secret",
            Self::InvalidCode => "invalid_code",
            Self::RedirectUriMismatch => "redirect_uri_mismatch",
            Self::ExpiredCode => "expired_code",
            Self::MissingCodeVerifier => "missing_code_verifier",
            Self::InvalidCodeVerifier => "invalid_code_verifier",
            Self::InvalidIdentity => "invalid_identity",
            Self::InvalidToken => "invalid_token",
            Self::Validation { .. } => "invalid_field",
            Self::ClientNotFound(_) => "client_not_found",
            Self::TokenNotFound => "token_not_found",
            Self::PersonalClient(_) => "personal_client",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::Storage(_) => "could_not_save",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::SecretRequired | Self::InvalidSecret | Self::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            Self::InvalidToken | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::InvalidCode | Self::ClientNotFound(_) | Self::TokenNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Closest RFC 6749 §5.2 error code, for standards-only clients.
    #[must_use]
    pub const fn rfc6749_error(&self) -> &'static str {
        match self {
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::InvalidClient(_) | Self::SecretRequired | Self::InvalidSecret => "invalid_client",
            Self::InvalidCode
            | Self::RedirectUriMismatch
            | Self::ExpiredCode
            | Self::MissingCodeVerifier
            | Self::InvalidCodeVerifier
            | Self::InvalidIdentity => "invalid_grant",
            Self::InvalidToken => "invalid_token",
            Self::Storage(_) => "server_error",
            _ => "invalid_request",
        }
    }

    /// Returns true for failures the caller caused (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
            "data": { "status": status.as_u16() },
            "error": self.rfc6749_error(),
            "error_description": self.to_string(),
        });

        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::InvalidToken) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Bearer error="invalid_token""#),
            );
        } else if matches!(self, Self::Unauthenticated) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Result type alias for protocol operations.
pub type OAuthResult<T> = Result<T, OAuthError>;
