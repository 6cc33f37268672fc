// Login strategies, one per AuthKind

use std::time::Duration;

use url::Url;

use super::cache::SessionCredentialCache;
use super::identity;
use super::token::acquire_token;
use super::types::{
    AuthKind, Credential, CredentialMaterial, LoginOptions, LoginOutcome, SearchRequest, SessionId,
};
use crate::error::{LoginError, Result};
use crate::ports::{CaptureRequest, CookieCapture, CredentialPrompt, TokenProvider, TokenRequest};

const CREDENTIAL_PROMPT: &str = "Enter username/password";

/// Collaborators and switches shared by every strategy
pub(crate) struct StrategyContext<'a> {
    pub session: SessionId,
    pub credential: Option<&'a Credential>,
    pub options: &'a LoginOptions,
    pub prompt: &'a dyn CredentialPrompt,
    pub cookies: &'a dyn CookieCapture,
    pub tokens: &'a dyn TokenProvider,
    pub cache: &'a SessionCredentialCache,
    pub token_timeout: Duration,
}

/// Run the strategy for `kind` without touching the request
pub(crate) async fn run(
    kind: AuthKind,
    request: &SearchRequest,
    ctx: &StrategyContext<'_>,
) -> Result<LoginOutcome> {
    match kind {
        AuthKind::CurrentIdentity => current_identity_login(),
        AuthKind::NetworkCredential => network_credential_login(request, ctx).await,
        AuthKind::LegacyCookie => legacy_cookie_login(request, ctx).await,
        AuthKind::ManagementToken => management_token_login(request, ctx).await,
    }
}

fn current_identity_login() -> Result<LoginOutcome> {
    let identity = identity::current_identity()?;
    tracing::debug!("Using current identity {}", identity);

    Ok(LoginOutcome {
        kind: AuthKind::CurrentIdentity,
        username: Some(identity),
        material: None,
    })
}

async fn network_credential_login(
    request: &SearchRequest,
    ctx: &StrategyContext<'_>,
) -> Result<LoginOutcome> {
    let credential = match ctx.credential {
        Some(credential) => credential.clone(),
        None => ctx
            .prompt
            .prompt(CREDENTIAL_PROMPT, request.username.as_deref())
            .await
            .map_err(|e| {
                LoginError::AuthenticationFailed(format!("credential prompt failed: {:#}", e))
            })?
            .filter(|c| !c.username.trim().is_empty())
            .ok_or_else(|| {
                LoginError::AuthenticationFailed("no username/password was entered".to_string())
            })?,
    };

    Ok(LoginOutcome {
        kind: AuthKind::NetworkCredential,
        username: Some(credential.username),
        material: Some(CredentialMaterial::Password(credential.password)),
    })
}

async fn legacy_cookie_login(
    request: &SearchRequest,
    ctx: &StrategyContext<'_>,
) -> Result<LoginOutcome> {
    let session = ctx.session;
    let cookies = ctx.cookies;
    let site_url = request.site_url.as_str();
    let accept_invalid_certs = ctx.options.skip_server_certificate_validation;

    // The site URL only matters when no cookies are cached yet
    let bag = ctx
        .cache
        .get_or_create(session, move || async move {
            tracing::info!(
                "No cookies cached for session {}, starting interactive sign-in",
                session
            );

            let capture_request = CaptureRequest {
                site_url: parse_site_url(site_url)?,
                style: AuthKind::LegacyCookie,
                accept_invalid_certs,
            };
            let captured = cookies.capture(capture_request).await.map_err(|e| {
                LoginError::AuthenticationFailed(format!("cookie capture failed: {:#}", e))
            })?;

            match captured {
                Some(bag) if !bag.is_empty() => Ok(bag),
                _ => Err(LoginError::AuthenticationFailed(
                    "Authentication cookie returned is null! Authentication failed. Please try again."
                        .to_string(),
                )),
            }
        })
        .await?;

    tracing::debug!("Attaching cookies {:?} to request", bag.names());

    Ok(LoginOutcome {
        kind: AuthKind::LegacyCookie,
        username: None,
        material: Some(CredentialMaterial::Cookies(bag)),
    })
}

async fn management_token_login(
    request: &SearchRequest,
    ctx: &StrategyContext<'_>,
) -> Result<LoginOutcome> {
    let token_request = TokenRequest {
        site_url: parse_site_url(&request.site_url)?,
        force_interactive: ctx.options.force_login_prompt,
        credential: ctx.credential.cloned(),
        accept_invalid_certs: ctx.options.skip_server_certificate_validation,
    };

    let token = acquire_token(ctx.tokens, token_request, ctx.token_timeout).await?;

    Ok(LoginOutcome {
        kind: AuthKind::ManagementToken,
        username: None,
        material: Some(CredentialMaterial::Token(token)),
    })
}

fn parse_site_url(site_url: &str) -> Result<Url> {
    Url::parse(site_url.trim()).map_err(|e| {
        LoginError::AuthenticationFailed(format!(
            "site URL '{}' is not a valid absolute URL: {}",
            site_url, e
        ))
    })
}
