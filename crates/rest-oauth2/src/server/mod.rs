//! HTTP surface of the authorization server.
//!
//! Wires the protocol engine to axum:
//! - the login-bound authorization endpoint and its approval page
//! - the token endpoint
//! - bearer authentication for the profile and admin JSON APIs

pub mod authorize;
pub mod clients;
pub mod middleware;
pub mod pages;
pub mod token;
pub mod tokens;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::http::HeaderName;

use crate::config::Config;
use crate::grant::{GrantContext, GrantRegistry, GrantType, RedirectArgsTransformer};
use crate::identity::{HeaderSession, IdentityDirectory, LoginSession, NoSession};
use crate::nonce::NonceSigner;
use crate::policy::{DefaultPolicy, Policy};
use crate::registry::ClientRegistry;
use crate::store::Store;
use crate::tokens::TokenStore;
use transport::HttpState;

/// Builder and runner for the OAuth 2.0 server.
pub struct OAuthServer {
    config: Config,
    ctx: GrantContext,
    grants: GrantRegistry,
    session: Arc<dyn LoginSession>,
    policy: Arc<dyn Policy>,
}

impl OAuthServer {
    /// Create a server over the given store and identity directory.
    ///
    /// # Errors
    ///
    /// Returns error if the configured identity header is not a valid header name.
    ///
    /// The identity header is trusted only when configured. Without it no
    /// request has a login session until [`OAuthServer::with_session`] installs one.
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        identities: Arc<dyn IdentityDirectory>,
    ) -> anyhow::Result<Self> {
        let session: Arc<dyn LoginSession> = match &config.identity_header {
            Some(name) => {
                let header = HeaderName::from_bytes(name.trim().as_bytes())
                    .with_context(|| format!("invalid identity header '{name}'"))?;
                tracing::info!(header = %header, "Trusting proxy identity header");
                Arc::new(HeaderSession::new(header, config.login_url.clone()))
            }
            None => {
                tracing::warn!("No identity header configured; only bearer tokens authenticate");
                Arc::new(NoSession::new(config.login_url.clone()))
            }
        };

        let nonces = match &config.nonce_secret {
            Some(secret) => NonceSigner::new(secret.as_bytes()),
            None => {
                tracing::warn!("No nonce secret configured; approval forms will not survive a restart");
                NonceSigner::random()
            }
        };

        let registry = ClientRegistry::new(Arc::clone(&store))
            .with_token_cascade(config.revoke_tokens_on_client_delete);
        let tokens = TokenStore::new(store, identities);
        let ctx = GrantContext::new(registry, tokens, nonces).with_force_pkce(config.force_pkce);

        Ok(Self {
            config,
            ctx,
            grants: GrantRegistry::with_defaults(),
            session,
            policy: Arc::new(DefaultPolicy),
        })
    }

    /// Replace the login session collaborator.
    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn LoginSession>) -> Self {
        self.session = session;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.policy = policy;
        self
    }

    /// Register an additional grant type.
    #[must_use]
    pub fn with_grant(mut self, grant: Arc<dyn GrantType>) -> Self {
        self.grants.register(grant);
        self
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: Arc<dyn RedirectArgsTransformer>) -> Self {
        self.ctx = self.ctx.with_transformer(transformer);
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &ClientRegistry {
        &self.ctx.registry
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenStore {
        &self.ctx.tokens
    }

    /// Build the axum router.
    #[must_use]
    pub fn router(&self) -> Router {
        transport::create_router(Arc::new(HttpState {
            config: self.config.clone(),
            ctx: self.ctx.clone(),
            grants: self.grants.clone(),
            session: Arc::clone(&self.session),
            policy: Arc::clone(&self.policy),
        }))
    }

    /// Run the server in HTTP mode.
    ///
    /// # Errors
    ///
    /// Returns error on server failure.
    pub async fn run_http(self, port: u16) -> anyhow::Result<()> {
        tracing::info!("Starting OAuth 2.0 server on port {}", port);
        tracing::info!("Grant types: {}", self.grants.names().join(", "));

        let cleanup =
            Arc::new(self.ctx.tokens.clone()).start_cleanup_task(self.config.code_cleanup_interval);

        let router = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!("HTTP server listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

        cleanup.abort();
        tracing::info!("HTTP server shut down");
        Ok(())
    }
}

impl std::fmt::Debug for OAuthServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthServer")
            .field("config", &self.config)
            .field("grants", &self.grants)
            .finish_non_exhaustive()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
