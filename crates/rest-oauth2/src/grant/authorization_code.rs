//! `response_type=code`: redirect with a single-use authorization code.

use super::{Delivery, GrantContext, GrantType, RedirectArgs, ValidatedRequest};
use crate::error::OAuthResult;
use crate::identity::IdentityId;
use crate::models::Client;

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationCodeGrant;

#[async_trait::async_trait]
impl GrantType for AuthorizationCodeGrant {
    fn name(&self) -> &'static str {
        "authorization_code"
    }

    fn response_type_code(&self) -> &'static str {
        "code"
    }

    fn delivery(&self) -> Delivery {
        Delivery::Query
    }

    async fn approve(
        &self,
        ctx: &GrantContext,
        client: &Client,
        identity: &IdentityId,
        request: &ValidatedRequest,
    ) -> OAuthResult<RedirectArgs> {
        let code = ctx
            .tokens
            .create_authorization_code(client, identity, &request.redirect_uri, request.pkce.clone())
            .await?;
        Ok(vec![("code".to_owned(), code.code)])
    }
}
