//! Grant type handlers for the authorization endpoint.
//!
//! Each [`GrantType`] owns one `response_type`. The shared request state machine
//! lives in [`flow`]; handlers only decide what an approved request produces.

mod authorization_code;
mod flow;
mod implicit;

use std::sync::Arc;

pub use authorization_code::AuthorizationCodeGrant;
pub use implicit::ImplicitGrant;
use serde::Deserialize;

use crate::error::OAuthResult;
use crate::identity::IdentityId;
use crate::models::Client;
use crate::nonce::NonceSigner;
use crate::pkce::CodeChallenge;
use crate::registry::ClientRegistry;
use crate::tokens::TokenStore;

/// Query parameters of an authorization request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationRequest {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
}

/// The resource owner's answer from the approval form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecisionForm {
    #[serde(rename = "_wpnonce")]
    pub nonce: Option<String>,
    #[serde(rename = "wp-submit")]
    pub action: Option<String>,
}

/// An authorization request whose client, redirect URI and PKCE are valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub response_type: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub pkce: Option<CodeChallenge>,
}

/// A request waiting for the resource owner's decision.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub client: Client,
    pub request: ValidatedRequest,
    /// Anti-forgery token to embed in the form.
    pub nonce: String,
}

/// Result of driving an authorization request.
#[derive(Debug, Clone)]
pub enum AuthorizationOutcome {
    /// Send the user agent back to the client.
    Redirect(String),
    /// Nobody is logged in; send the user agent here first.
    LoginRequired(String),
    /// Ask the resource owner to approve or deny.
    RenderForm(PendingAuthorization),
}

/// Where redirect arguments are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Query,
    Fragment,
}

/// Ordered redirect arguments.
pub type RedirectArgs = Vec<(String, String)>;

/// Hook that may rewrite redirect arguments before they are serialised.
pub trait RedirectArgsTransformer: Send + Sync {
    fn transform(&self, grant: &str, client: &Client, args: &mut RedirectArgs);
}

/// Collaborators shared by every grant handler.
#[derive(Clone)]
pub struct GrantContext {
    pub registry: ClientRegistry,
    pub tokens: TokenStore,
    pub nonces: NonceSigner,
    /// Require PKCE on every authorization request.
    pub force_pkce: bool,
    pub transformers: Vec<Arc<dyn RedirectArgsTransformer>>,
}

impl GrantContext {
    #[must_use]
    pub fn new(registry: ClientRegistry, tokens: TokenStore, nonces: NonceSigner) -> Self {
        Self { registry, tokens, nonces, force_pkce: false, transformers: Vec::new() }
    }

    #[must_use]
    pub fn with_force_pkce(mut self, force: bool) -> Self {
        self.force_pkce = force;
        self
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: Arc<dyn RedirectArgsTransformer>) -> Self {
        self.transformers.push(transformer);
        self
    }
}

impl std::fmt::Debug for GrantContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantContext")
            .field("force_pkce", &self.force_pkce)
            .field("transformers", &self.transformers.len())
            .finish_non_exhaustive()
    }
}

/// A pluggable authorization grant.
#[async_trait::async_trait]
pub trait GrantType: Send + Sync {
    /// Grant type name advertised in the API index.
    fn name(&self) -> &'static str;

    /// The `response_type` routed to this handler.
    fn response_type_code(&self) -> &'static str;

    fn delivery(&self) -> Delivery;

    /// Produce the redirect arguments for an approved request.
    async fn approve(
        &self,
        ctx: &GrantContext,
        client: &Client,
        identity: &IdentityId,
        request: &ValidatedRequest,
    ) -> OAuthResult<RedirectArgs>;

    /// Drive an authorization request through validation and the user's decision.
    ///
    /// `login_url` is where an anonymous user is sent; it should replay the
    /// current request after login.
    async fn handle_authorization_request(
        &self,
        ctx: &GrantContext,
        request: &AuthorizationRequest,
        form: Option<&DecisionForm>,
        identity: Option<&IdentityId>,
        login_url: &str,
    ) -> OAuthResult<AuthorizationOutcome> {
        flow::run(self, ctx, request, form, identity, login_url).await
    }
}

/// Grant handlers keyed by `response_type`.
#[derive(Clone, Default)]
pub struct GrantRegistry {
    grants: Vec<Arc<dyn GrantType>>,
}

impl GrantRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the authorization-code and implicit grants.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AuthorizationCodeGrant));
        registry.register(Arc::new(ImplicitGrant));
        registry
    }

    /// Add a handler. A later handler for the same `response_type` wins.
    pub fn register(&mut self, grant: Arc<dyn GrantType>) {
        tracing::debug!(
            grant = grant.name(),
            response_type = grant.response_type_code(),
            "Registered grant type"
        );
        self.grants.push(grant);
    }

    #[must_use]
    pub fn for_response_type(&self, response_type: &str) -> Option<Arc<dyn GrantType>> {
        self.grants.iter().rev().find(|g| g.response_type_code() == response_type).cloned()
    }

    /// Names of the registered grant types, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for grant in &self.grants {
            if !names.contains(&grant.name()) {
                names.push(grant.name());
            }
        }
        names
    }
}

impl std::fmt::Debug for GrantRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantRegistry").field("grants", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = GrantRegistry::with_defaults();
        assert_eq!(registry.names(), ["authorization_code", "implicit"]);
        assert_eq!(registry.for_response_type("code").unwrap().name(), "authorization_code");
        assert_eq!(registry.for_response_type("token").unwrap().delivery(), Delivery::Fragment);
        assert!(registry.for_response_type("id_token").is_none());
    }

    #[test]
    fn test_later_registration_wins() {
        struct CustomCode;

        #[async_trait::async_trait]
        impl GrantType for CustomCode {
            fn name(&self) -> &'static str {
                "custom_code"
            }
            fn response_type_code(&self) -> &'static str {
                "code"
            }
            fn delivery(&self) -> Delivery {
                Delivery::Query
            }
            async fn approve(
                &self,
                _ctx: &GrantContext,
                _client: &Client,
                _identity: &IdentityId,
                _request: &ValidatedRequest,
            ) -> OAuthResult<RedirectArgs> {
                Ok(vec![("code".into(), "custom".into())])
            }
        }

        let mut registry = GrantRegistry::with_defaults();
        registry.register(Arc::new(CustomCode));
        assert_eq!(registry.for_response_type("code").unwrap().name(), "custom_code");
        assert_eq!(registry.names().len(), 3);
    }
}
