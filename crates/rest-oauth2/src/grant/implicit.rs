//! `response_type=token`: the access token travels in the redirect fragment.

use std::collections::BTreeMap;

use super::{Delivery, GrantContext, GrantType, RedirectArgs, ValidatedRequest};
use crate::error::OAuthResult;
use crate::identity::IdentityId;
use crate::models::Client;

#[derive(Debug, Clone, Copy, Default)]
pub struct ImplicitGrant;

#[async_trait::async_trait]
impl GrantType for ImplicitGrant {
    fn name(&self) -> &'static str {
        "implicit"
    }

    fn response_type_code(&self) -> &'static str {
        "token"
    }

    // Tokens never go in the query string.
    fn delivery(&self) -> Delivery {
        Delivery::Fragment
    }

    async fn approve(
        &self,
        ctx: &GrantContext,
        client: &Client,
        identity: &IdentityId,
        _request: &ValidatedRequest,
    ) -> OAuthResult<RedirectArgs> {
        let token = ctx.tokens.create_access_token(client, identity, BTreeMap::new()).await?;
        Ok(vec![
            ("access_token".to_owned(), token.key),
            ("token_type".to_owned(), "bearer".to_owned()),
        ])
    }
}
