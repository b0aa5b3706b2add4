//! Data models for clients, codes and tokens.

mod client;
mod token;

pub use client::{Client, ClientStatus, ClientType, PERSONAL_CLIENT_ID};
pub use token::{AccessToken, AuthorizationCode};
