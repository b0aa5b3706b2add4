//! Token store: authorization codes and access tokens.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use crate::credentials::{self, ACCESS_TOKEN_LENGTH, AUTH_CODE_LENGTH};
use crate::error::{OAuthError, OAuthResult, StoreError};
use crate::identity::{IdentityDirectory, IdentityId};
use crate::models::{AccessToken, AuthorizationCode, Client};
use crate::pkce::CodeChallenge;
use crate::store::Store;

/// Authorization code lifetime in seconds.
pub const AUTH_CODE_LIFETIME: i64 = 600;

/// What a successfully redeemed code hands to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemedCode {
    pub identity: IdentityId,
    pub redirect_uri: String,
    pub pkce: Option<CodeChallenge>,
}

/// Issues, looks up and revokes codes and access tokens.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn Store>,
    identities: Arc<dyn IdentityDirectory>,
}

impl TokenStore {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, identities: Arc<dyn IdentityDirectory>) -> Self {
        Self { store, identities }
    }

    /// The directory used to resolve token owners.
    #[must_use]
    pub fn identities(&self) -> &Arc<dyn IdentityDirectory> {
        &self.identities
    }

    /// Mint a single-use code for `client`, valid for ten minutes.
    pub async fn create_authorization_code(
        &self,
        client: &Client,
        identity: &IdentityId,
        redirect_uri: &str,
        pkce: Option<CodeChallenge>,
    ) -> OAuthResult<AuthorizationCode> {
        if client.is_personal() {
            return Err(OAuthError::PersonalClient("cannot issue authorization codes"));
        }

        let issued_at = Utc::now();
        let code = AuthorizationCode {
            code: credentials::generate(AUTH_CODE_LENGTH),
            client_id: client.id.clone(),
            identity: identity.clone(),
            redirect_uri: redirect_uri.to_owned(),
            pkce,
            issued_at,
            expires_at: issued_at + Duration::seconds(AUTH_CODE_LIFETIME),
        };
        self.store.insert_code(code.clone()).await?;

        tracing::info!(
            client_id = %client.id,
            identity = %identity,
            pkce = code.pkce.is_some(),
            "Issued authorization code"
        );
        Ok(code)
    }

    pub async fn get_authorization_code(
        &self,
        client: &Client,
        code: &str,
    ) -> OAuthResult<AuthorizationCode> {
        self.store.get_code(&client.id, code).await?.ok_or(OAuthError::InvalidCode)
    }

    /// Consume a code. The code is gone afterwards whatever the outcome.
    pub async fn redeem(&self, client: &Client, code: &str) -> OAuthResult<RedeemedCode> {
        let Some(record) = self.store.take_code(&client.id, code).await? else {
            return Err(OAuthError::InvalidCode);
        };

        if record.is_expired_at(Utc::now()) {
            tracing::warn!(client_id = %client.id, "Rejected expired authorization code");
            return Err(OAuthError::ExpiredCode);
        }

        Ok(RedeemedCode {
            identity: record.identity,
            redirect_uri: record.redirect_uri,
            pkce: record.pkce,
        })
    }

    /// Mint an access token for a resolvable identity.
    pub async fn create_access_token(
        &self,
        client: &Client,
        identity: &IdentityId,
        meta: BTreeMap<String, String>,
    ) -> OAuthResult<AccessToken> {
        if self.identities.resolve(identity).await.is_none() {
            return Err(OAuthError::InvalidIdentity);
        }

        let token = AccessToken {
            key: credentials::generate(ACCESS_TOKEN_LENGTH),
            identity: identity.clone(),
            client_id: client.id.clone(),
            created_at: Utc::now(),
            meta,
        };
        self.store.insert_token(token.clone()).await?;

        tracing::info!(client_id = %client.id, identity = %identity, "Issued access token");
        Ok(token)
    }

    /// Point lookup by key.
    pub async fn get_access_token(&self, key: &str) -> OAuthResult<AccessToken> {
        self.store.get_token(key).await?.ok_or(OAuthError::TokenNotFound)
    }

    pub async fn get_tokens_for_identity(
        &self,
        identity: &IdentityId,
    ) -> OAuthResult<Vec<AccessToken>> {
        Ok(self.store.tokens_for_identity(identity).await?)
    }

    /// Revoke a token. The caller checks entitlement first.
    pub async fn revoke(&self, token: &AccessToken) -> OAuthResult<bool> {
        let removed = self.store.remove_token(&token.key).await?;
        if removed {
            tracing::info!(
                client_id = %token.client_id,
                identity = %token.identity,
                "Revoked access token"
            );
        }
        Ok(removed)
    }

    pub async fn revoke_for_client(&self, client_id: &str) -> OAuthResult<usize> {
        let count = self.store.remove_tokens_for_client(client_id).await?;
        tracing::info!(client_id, count, "Revoked client tokens");
        Ok(count)
    }

    /// Remove expired authorization codes.
    pub async fn purge_expired(&self) -> Result<usize, StoreError> {
        let removed = self.store.purge_expired_codes(Utc::now()).await?;
        if removed > 0 {
            tracing::debug!(count = removed, "Cleaned up expired authorization codes");
        }
        Ok(removed)
    }

    /// Start background cleanup of expired codes.
    pub fn start_cleanup_task(self: Arc<Self>, every: StdDuration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = self.purge_expired().await {
                    tracing::warn!(error = %e, "Authorization code cleanup failed");
                }
            }
        })
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}
