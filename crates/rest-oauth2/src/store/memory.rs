//! In-memory store following the `SessionManager` pattern.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ClientEdit, Store, StoreResult};
use crate::error::{OAuthResult, StoreError};
use crate::identity::IdentityId;
use crate::models::{AccessToken, AuthorizationCode, Client};

/// Codes are scoped by `(client_id, code)`.
type CodeKey = (String, String);

/// Tokens and their owner index live under one lock so a token is never
/// visible without its index entry.
#[derive(Default)]
struct TokenTable {
    by_key: HashMap<String, AccessToken>,
    by_identity: HashMap<IdentityId, BTreeSet<String>>,
}

impl TokenTable {
    fn remove(&mut self, key: &str) -> Option<AccessToken> {
        let token = self.by_key.remove(key)?;
        if let Some(keys) = self.by_identity.get_mut(&token.identity) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_identity.remove(&token.identity);
            }
        }
        Some(token)
    }
}

/// Process-local storage engine.
#[derive(Clone, Default)]
pub struct MemoryStore {
    clients: Arc<RwLock<HashMap<String, Client>>>,
    codes: Arc<RwLock<HashMap<CodeKey, AuthorizationCode>>>,
    tokens: Arc<RwLock<TokenTable>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn code_key(client_id: &str, code: &str) -> CodeKey {
        (client_id.to_owned(), code.to_owned())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn insert_client(&self, client: Client) -> StoreResult<()> {
        let mut clients = self.clients.write().await;
        if clients.contains_key(&client.id) {
            return Err(StoreError::conflict("client"));
        }
        clients.insert(client.id.clone(), client);
        Ok(())
    }

    async fn modify_client(&self, id: &str, edit: ClientEdit) -> OAuthResult<Client> {
        let mut clients = self.clients.write().await;
        let Some(slot) = clients.get_mut(id) else {
            return Err(StoreError::missing("client").into());
        };
        let mut updated = slot.clone();
        edit(&mut updated)?;
        *slot = updated.clone();
        Ok(updated)
    }

    async fn get_client(&self, id: &str) -> StoreResult<Option<Client>> {
        Ok(self.clients.read().await.get(id).cloned())
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        let mut clients: Vec<Client> = self.clients.read().await.values().cloned().collect();
        clients.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(clients)
    }

    async fn remove_client(&self, id: &str) -> StoreResult<bool> {
        let mut clients = self.clients.write().await;
        if clients.remove(id).is_none() {
            return Ok(false);
        }
        // Codes go with the client while its lock is held.
        self.codes.write().await.retain(|(client_id, _), _| client_id != id);
        Ok(true)
    }

    async fn insert_code(&self, code: AuthorizationCode) -> StoreResult<()> {
        let mut codes = self.codes.write().await;
        let key = Self::code_key(&code.client_id, &code.code);
        if codes.contains_key(&key) {
            return Err(StoreError::conflict("authorization code"));
        }
        codes.insert(key, code);
        Ok(())
    }

    async fn get_code(&self, client_id: &str, code: &str) -> StoreResult<Option<AuthorizationCode>> {
        Ok(self.codes.read().await.get(&Self::code_key(client_id, code)).cloned())
    }

    async fn take_code(
        &self,
        client_id: &str,
        code: &str,
    ) -> StoreResult<Option<AuthorizationCode>> {
        Ok(self.codes.write().await.remove(&Self::code_key(client_id, code)))
    }

    async fn purge_expired_codes(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut codes = self.codes.write().await;
        let before = codes.len();
        codes.retain(|_, code| !code.is_expired_at(now));
        Ok(before - codes.len())
    }

    async fn insert_token(&self, token: AccessToken) -> StoreResult<()> {
        let mut tokens = self.tokens.write().await;
        if tokens.by_key.contains_key(&token.key) {
            return Err(StoreError::conflict("access token"));
        }
        tokens.by_identity.entry(token.identity.clone()).or_default().insert(token.key.clone());
        tokens.by_key.insert(token.key.clone(), token);
        Ok(())
    }

    async fn get_token(&self, key: &str) -> StoreResult<Option<AccessToken>> {
        Ok(self.tokens.read().await.by_key.get(key).cloned())
    }

    async fn tokens_for_identity(&self, identity: &IdentityId) -> StoreResult<Vec<AccessToken>> {
        let tokens = self.tokens.read().await;
        let mut found: Vec<AccessToken> = tokens
            .by_identity
            .get(identity)
            .into_iter()
            .flatten()
            .filter_map(|key| tokens.by_key.get(key).cloned())
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn remove_token(&self, key: &str) -> StoreResult<bool> {
        Ok(self.tokens.write().await.remove(key).is_some())
    }

    async fn remove_tokens_for_client(&self, client_id: &str) -> StoreResult<usize> {
        let mut tokens = self.tokens.write().await;
        let keys: Vec<String> = tokens
            .by_key
            .values()
            .filter(|t| t.client_id == client_id)
            .map(|t| t.key.clone())
            .collect();
        for key in &keys {
            tokens.remove(key);
        }
        Ok(keys.len())
    }
}
