//! The authorization request state machine shared by all grants.

use url::Url;
use url::form_urlencoded;

use super::{
    AuthorizationOutcome, AuthorizationRequest, DecisionForm, Delivery, GrantContext, GrantType,
    PendingAuthorization, RedirectArgs, ValidatedRequest,
};
use crate::error::{OAuthError, OAuthResult};
use crate::identity::IdentityId;
use crate::models::Client;
use crate::nonce;
use crate::pkce::CodeChallenge;
use crate::registry::ClientRegistry;

const ACTION_AUTHORIZE: &str = "authorize";
const ACTION_CANCEL: &str = "cancel";

pub(super) async fn run<G: GrantType + ?Sized>(
    grant: &G,
    ctx: &GrantContext,
    request: &AuthorizationRequest,
    form: Option<&DecisionForm>,
    identity: Option<&IdentityId>,
    login_url: &str,
) -> OAuthResult<AuthorizationOutcome> {
    let client_id = non_empty(request.client_id.as_deref()).ok_or(OAuthError::MissingClientId)?;
    let client = ctx
        .registry
        .find(client_id)
        .await?
        .ok_or_else(|| OAuthError::InvalidClientId(client_id.to_owned()))?;
    if !client.is_active() {
        return Err(OAuthError::UnapprovedClient(client.id));
    }

    let redirect_uri = resolve_redirect_uri(&client, request.redirect_uri.as_deref())?;
    let state = non_empty(request.state.as_deref()).map(str::to_owned);

    let pkce = match CodeChallenge::from_request(
        request.code_challenge.as_deref(),
        request.code_challenge_method.as_deref(),
        ctx.force_pkce,
    ) {
        Ok(pkce) => pkce,
        Err(e) => {
            tracing::warn!(client_id = %client.id, error = %e, "Rejected PKCE parameters");
            let args = vec![
                ("error".to_owned(), "invalid_request".to_owned()),
                ("error_description".to_owned(), e.to_string()),
            ];
            let location = finish(grant, ctx, &client, &redirect_uri, args, state.as_deref())?;
            return Ok(AuthorizationOutcome::Redirect(location));
        }
    };

    let validated = ValidatedRequest {
        response_type: grant.response_type_code().to_owned(),
        redirect_uri,
        scope: request.scope.clone(),
        state,
        pkce,
    };

    let Some(identity) = identity else {
        return Ok(AuthorizationOutcome::LoginRequired(login_url.to_owned()));
    };

    let action = nonce::authorize_action(grant.response_type_code(), &client.id);
    let Some(submitted) = form.and_then(|f| non_empty(f.nonce.as_deref())) else {
        let nonce = ctx.nonces.create(&action, identity);
        return Ok(AuthorizationOutcome::RenderForm(PendingAuthorization {
            client,
            request: validated,
            nonce,
        }));
    };

    if !ctx.nonces.verify(submitted, &action, identity) {
        tracing::warn!(client_id = %client.id, identity = %identity, "Rejected authorization nonce");
        return Err(OAuthError::InvalidNonce);
    }

    let args = match form.and_then(|f| f.action.as_deref()) {
        Some(ACTION_AUTHORIZE) => grant.approve(ctx, &client, identity, &validated).await?,
        Some(ACTION_CANCEL) => {
            tracing::info!(client_id = %client.id, identity = %identity, "Authorization denied");
            vec![("error".to_owned(), "access_denied".to_owned())]
        }
        _ => return Err(OAuthError::InvalidAction),
    };

    let location =
        finish(grant, ctx, &client, &validated.redirect_uri, args, validated.state.as_deref())?;
    Ok(AuthorizationOutcome::Redirect(location))
}

/// Use the supplied redirect URI if registered, else the only registered one.
fn resolve_redirect_uri(client: &Client, supplied: Option<&str>) -> OAuthResult<String> {
    match non_empty(supplied) {
        Some(uri) if ClientRegistry::check_redirect_uri(client, uri) => Ok(uri.to_owned()),
        Some(_) => Err(OAuthError::InvalidRedirectUri),
        None => match client.redirect_uris.as_slice() {
            [only] => Ok(only.clone()),
            _ => Err(OAuthError::MissingRedirectUri),
        },
    }
}

fn finish<G: GrantType + ?Sized>(
    grant: &G,
    ctx: &GrantContext,
    client: &Client,
    redirect_uri: &str,
    mut args: RedirectArgs,
    state: Option<&str>,
) -> OAuthResult<String> {
    if let Some(state) = state {
        args.push(("state".to_owned(), state.to_owned()));
    }
    for transformer in &ctx.transformers {
        transformer.transform(grant.name(), client, &mut args);
    }
    build_redirect(redirect_uri, grant.delivery(), &args)
}

/// Append `args` to `redirect_uri` in the query or the fragment.
pub(super) fn build_redirect(
    redirect_uri: &str,
    delivery: Delivery,
    args: &[(String, String)],
) -> OAuthResult<String> {
    let mut url = Url::parse(redirect_uri).map_err(|_| OAuthError::InvalidRedirectUri)?;
    match delivery {
        Delivery::Query => {
            url.query_pairs_mut().extend_pairs(args);
        }
        Delivery::Fragment => {
            let fragment = form_urlencoded::Serializer::new(String::new()).extend_pairs(args).finish();
            url.set_fragment(Some(&fragment));
        }
    }
    Ok(url.into())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
