//! Client registry: registration, approval, secrets and redirect checks.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::credentials::{self, CLIENT_ID_LENGTH, CLIENT_SECRET_LENGTH};
use crate::error::{OAuthError, OAuthResult, StoreError};
use crate::identity::IdentityId;
use crate::models::{Client, ClientStatus, ClientType, PERSONAL_CLIENT_ID};
use crate::redirect;
use crate::store::Store;

/// Attempts at finding an unused client id before giving up.
const ID_ATTEMPTS: usize = 3;

/// Fields submitted when registering a client.
#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub client_type: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// Mutable client fields; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub client_type: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
}

/// Owns registered client records.
#[derive(Clone)]
pub struct ClientRegistry {
    store: Arc<dyn Store>,
    revoke_tokens_on_delete: bool,
}

impl ClientRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, revoke_tokens_on_delete: false }
    }

    /// Also revoke a client's access tokens when it is deleted.
    #[must_use]
    pub fn with_token_cascade(mut self, enabled: bool) -> Self {
        self.revoke_tokens_on_delete = enabled;
        self
    }

    /// Register a new client in draft status.
    pub async fn create(&self, new: NewClient, owner: &IdentityId) -> OAuthResult<Client> {
        let name = required_text("name", &new.name)?;
        let description = required_text("description", &new.description)?;
        let client_type = parse_type(&new.client_type)?;
        let redirect_uris = validate_redirect_uris(&new.redirect_uris)?;

        let mut client = Client {
            id: String::new(),
            secret: (client_type == ClientType::Private)
                .then(|| credentials::generate(CLIENT_SECRET_LENGTH)),
            client_type,
            redirect_uris,
            name,
            description,
            status: ClientStatus::Draft,
            owner: Some(owner.clone()),
            created_at: Utc::now(),
        };

        for attempt in 1..=ID_ATTEMPTS {
            client.id = credentials::generate(CLIENT_ID_LENGTH);
            match self.store.insert_client(client.clone()).await {
                Ok(()) => {
                    tracing::info!(
                        client_id = %client.id,
                        owner = %owner,
                        client_type = %client.client_type,
                        "Registered OAuth client"
                    );
                    return Ok(client);
                }
                Err(StoreError::Conflict { .. }) if attempt < ID_ATTEMPTS => {
                    tracing::debug!(attempt, "Client id collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::conflict("client").into())
    }

    /// Look up a client, including the Personal Client.
    pub async fn find(&self, id: &str) -> OAuthResult<Option<Client>> {
        if id == PERSONAL_CLIENT_ID {
            return Ok(Some(Client::personal()));
        }
        Ok(self.store.get_client(id).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> OAuthResult<Client> {
        self.find(id).await?.ok_or_else(|| OAuthError::ClientNotFound(id.to_owned()))
    }

    /// All registered clients (the Personal Client is not listed).
    pub async fn list(&self) -> OAuthResult<Vec<Client>> {
        Ok(self.store.list_clients().await?)
    }

    pub async fn list_for_owner(&self, owner: &IdentityId) -> OAuthResult<Vec<Client>> {
        let clients = self.store.list_clients().await?;
        Ok(clients.into_iter().filter(|c| c.owner.as_ref() == Some(owner)).collect())
    }

    /// Change display fields, redirect URIs or type. Id and secret are kept,
    /// except that becoming private issues a secret and becoming public drops it.
    ///
    /// Changes apply to the stored record, not to `client`, so concurrent
    /// writes to other fields are kept.
    pub async fn update(&self, client: &Client, changes: ClientUpdate) -> OAuthResult<Client> {
        if client.is_personal() {
            return Err(OAuthError::PersonalClient("cannot be updated"));
        }

        let name = changes.name.as_deref().map(|n| required_text("name", n)).transpose()?;
        let description =
            changes.description.as_deref().map(|d| required_text("description", d)).transpose()?;
        let redirect_uris =
            changes.redirect_uris.as_deref().map(validate_redirect_uris).transpose()?;
        let client_type = changes.client_type.as_deref().map(parse_type).transpose()?;

        let updated = self
            .modify(client, move |current| {
                if let Some(name) = name {
                    current.name = name;
                }
                if let Some(description) = description {
                    current.description = description;
                }
                if let Some(uris) = redirect_uris {
                    current.redirect_uris = uris;
                }
                if let Some(client_type) = client_type {
                    current.client_type = client_type;
                    match client_type {
                        ClientType::Private if current.secret.is_none() => {
                            current.secret = Some(credentials::generate(CLIENT_SECRET_LENGTH));
                        }
                        ClientType::Public => current.secret = None,
                        ClientType::Private => {}
                    }
                }
                Ok(())
            })
            .await?;
        tracing::info!(client_id = %updated.id, "Updated OAuth client");
        Ok(updated)
    }

    pub async fn regenerate_secret(&self, client: &Client) -> OAuthResult<Client> {
        if client.is_personal() {
            return Err(OAuthError::PersonalClient("do not support secrets"));
        }
        let updated = self
            .modify(client, |current| {
                if !current.requires_secret() {
                    return Err(OAuthError::validation("type", "public clients have no secret"));
                }
                current.secret = Some(credentials::generate(CLIENT_SECRET_LENGTH));
                Ok(())
            })
            .await?;
        tracing::info!(client_id = %updated.id, "Regenerated client secret");
        Ok(updated)
    }

    /// Publish a draft client. Approving a published client is a no-op.
    pub async fn approve(&self, client: &Client) -> OAuthResult<Client> {
        if client.is_personal() {
            return Err(OAuthError::PersonalClient("do not have an approval status"));
        }
        let updated = self
            .modify(client, |current| {
                current.status = ClientStatus::Published;
                Ok(())
            })
            .await?;
        if client.status != ClientStatus::Published {
            tracing::info!(client_id = %updated.id, "Approved OAuth client");
        }
        Ok(updated)
    }

    /// Delete a client and its authorization codes.
    pub async fn delete(&self, client: &Client) -> OAuthResult<bool> {
        if client.is_personal() {
            return Ok(false);
        }
        let removed = self.store.remove_client(&client.id).await?;
        if removed {
            tracing::info!(client_id = %client.id, "Deleted OAuth client");
            if self.revoke_tokens_on_delete {
                let count = self.store.remove_tokens_for_client(&client.id).await?;
                tracing::info!(client_id = %client.id, count, "Revoked tokens of deleted client");
            }
        }
        Ok(removed)
    }

    async fn modify(
        &self,
        client: &Client,
        edit: impl FnOnce(&mut Client) -> OAuthResult<()> + Send + 'static,
    ) -> OAuthResult<Client> {
        self.store.modify_client(&client.id, Box::new(edit)).await.map_err(|e| match e {
            OAuthError::Storage(StoreError::Missing { .. }) => {
                OAuthError::ClientNotFound(client.id.clone())
            }
            other => other,
        })
    }

    #[must_use]
    pub fn check_redirect_uri(client: &Client, uri: &str) -> bool {
        redirect::matches_any(&client.redirect_uris, uri)
    }

    /// Verify a presented client secret.
    #[must_use]
    pub fn check_secret(client: &Client, secret: &str) -> bool {
        client.secret.as_deref().is_some_and(|expected| credentials::secrets_match(secret, expected))
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("revoke_tokens_on_delete", &self.revoke_tokens_on_delete)
            .finish()
    }
}

fn required_text(field: &'static str, value: &str) -> OAuthResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OAuthError::validation(field, "cannot be empty"));
    }
    Ok(trimmed.to_owned())
}

fn parse_type(value: &str) -> OAuthResult<ClientType> {
    value.trim().parse().map_err(|e: String| OAuthError::validation("type", e))
}

fn validate_redirect_uris(uris: &[String]) -> OAuthResult<Vec<String>> {
    let uris: Vec<String> =
        uris.iter().map(|u| u.trim().to_owned()).filter(|u| !u.is_empty()).collect();
    if uris.is_empty() {
        return Err(OAuthError::validation("redirect_uris", "at least one URI is required"));
    }
    for uri in &uris {
        redirect::validate_registration(uri)
            .map_err(|message| OAuthError::validation("redirect_uris", message))?;
    }
    Ok(uris)
}
