//! Authorization decisions for the profile and admin APIs.

use crate::identity::{IdentityId, Principal};
use crate::models::{AccessToken, Client};

/// Operations gated by a [`Policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// List, create, edit and delete clients.
    ManageClients,
    /// Publish a draft client.
    ApproveClients,
    /// List an identity's tokens.
    ViewTokens,
    /// Mint a personal access token for an identity.
    CreatePersonalToken,
    /// Revoke a single token.
    RevokeToken,
}

/// What an [`Action`] applies to.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Clients,
    Client(&'a Client),
    Identity(&'a IdentityId),
    Token(&'a AccessToken),
}

/// Decides whether a principal may perform an action.
pub trait Policy: Send + Sync {
    fn can(&self, principal: &Principal, action: Action, resource: Resource<'_>) -> bool;
}

/// Admins may do anything; everyone else may manage their own tokens and clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl Policy for DefaultPolicy {
    fn can(&self, principal: &Principal, action: Action, resource: Resource<'_>) -> bool {
        if principal.is_admin {
            return true;
        }
        match (action, resource) {
            (Action::ViewTokens | Action::CreatePersonalToken, Resource::Identity(id)) => {
                *id == principal.id
            }
            (Action::RevokeToken, Resource::Token(token)) => token.identity == principal.id,
            (Action::ManageClients, Resource::Client(client)) => {
                client.owner.as_ref() == Some(&principal.id)
            }
            _ => false,
        }
    }
}
