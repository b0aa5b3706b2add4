//! OAuth 2.0 Authorization Server
//!
//! Issues, validates and revokes the credentials that let third-party
//! applications act on behalf of a resource owner.
//!
//! # Features
//!
//! - **Client registry**: public and private clients, approval, secret rotation
//! - **Grants**: authorization code and implicit, with PKCE (`plain`, `S256`)
//! - **Token endpoint**: single-use code redemption, Basic or body client auth
//! - **Bearer authentication**: axum middleware for protected routes
//! - **Pluggable collaborators**: storage, identity directory, login session, policy
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rest_oauth2::{Config, MemoryStore, OAuthServer, StaticDirectory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let users = StaticDirectory::parse("alice:admin,bob");
//!     let server = OAuthServer::new(config, Arc::new(MemoryStore::new()), Arc::new(users))?;
//!
//!     server.run_http(8080).await
//! }
//! ```

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod exchange;
pub mod grant;
pub mod identity;
pub mod models;
pub mod nonce;
pub mod pkce;
pub mod policy;
pub mod redirect;
pub mod registry;
pub mod server;
pub mod store;
pub mod tokens;

pub use config::Config;
pub use error::{OAuthError, OAuthResult, StoreError};
pub use identity::{IdentityDirectory, IdentityId, LoginSession, Principal, StaticDirectory};
pub use registry::ClientRegistry;
pub use server::OAuthServer;
pub use store::{MemoryStore, Store};
pub use tokens::TokenStore;
