//! Persistence interface for clients, codes and tokens.
//!
//! The protocol engine talks to storage only through [`Store`]. Implementations
//! must honour three contracts:
//! - `take_code` is a single remove-and-return, so a code cannot be redeemed twice;
//! - `insert_token` never overwrites an existing key;
//! - `get_token` is a point lookup by key, independent of how many identities exist;
//! - `modify_client` edits the current record under the store's lock.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};

use crate::error::{OAuthResult, StoreError};
use crate::identity::IdentityId;
use crate::models::{AccessToken, AuthorizationCode, Client};

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// In-place edit of a stored client. An error leaves the record untouched.
pub type ClientEdit = Box<dyn FnOnce(&mut Client) -> OAuthResult<()> + Send>;

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Insert a new client. Fails with `Conflict` if the id is taken.
    async fn insert_client(&self, client: Client) -> StoreResult<()>;

    /// Apply `edit` to the current record and return the result. Fails with
    /// `Missing` if absent.
    async fn modify_client(&self, id: &str, edit: ClientEdit) -> OAuthResult<Client>;

    async fn get_client(&self, id: &str) -> StoreResult<Option<Client>>;

    async fn list_clients(&self) -> StoreResult<Vec<Client>>;

    /// Remove a client and every authorization code scoped to it.
    async fn remove_client(&self, id: &str) -> StoreResult<bool>;

    /// Insert a new code. Fails with `Conflict` on a duplicate.
    async fn insert_code(&self, code: AuthorizationCode) -> StoreResult<()>;

    async fn get_code(&self, client_id: &str, code: &str) -> StoreResult<Option<AuthorizationCode>>;

    /// Remove a code and return it, in one step.
    async fn take_code(&self, client_id: &str, code: &str)
    -> StoreResult<Option<AuthorizationCode>>;

    /// Drop codes that expired before `now`. Returns how many were removed.
    async fn purge_expired_codes(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    /// Insert a new token. Fails with `Conflict` if the key is taken.
    async fn insert_token(&self, token: AccessToken) -> StoreResult<()>;

    async fn get_token(&self, key: &str) -> StoreResult<Option<AccessToken>>;

    async fn tokens_for_identity(&self, identity: &IdentityId) -> StoreResult<Vec<AccessToken>>;

    async fn remove_token(&self, key: &str) -> StoreResult<bool>;

    /// Remove every token issued through a client. Returns how many were removed.
    async fn remove_tokens_for_client(&self, client_id: &str) -> StoreResult<usize>;
}
