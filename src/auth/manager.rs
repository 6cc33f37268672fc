use std::sync::Arc;
use std::time::Duration;

use super::cache::SessionCredentialCache;
use super::resolver::{self, ResolutionInputs};
use super::strategies::{self, StrategyContext};
use super::token::DEFAULT_TOKEN_TIMEOUT;
use super::types::{AuthKind, AuthMethod, Credential, LoginOptions, SearchRequest, SessionId};
use crate::error::Result;
use crate::ports::{CookieCapture, CredentialPrompt, TokenProvider};

/// Per-call login inputs
#[derive(Debug, Clone, Default)]
pub struct LoginParams {
    /// Session the captured cookies belong to
    pub session: SessionId,

    /// `--auth-method` from the command line
    pub explicit_method: Option<AuthMethod>,

    /// True when a saved preset was loaded
    pub using_preset: bool,

    /// Method recorded in the loaded preset
    pub preset_method: Option<AuthMethod>,

    /// Process-wide default method
    pub default_method: Option<AuthMethod>,

    /// Explicit username/password
    pub credential: Option<Credential>,

    pub options: LoginOptions,
}

/// Login orchestrator
/// Resolves the authentication method and runs the matching strategy
pub struct LoginManager {
    prompt: Arc<dyn CredentialPrompt>,
    cookies: Arc<dyn CookieCapture>,
    tokens: Arc<dyn TokenProvider>,

    /// Captured cookies per session
    cache: SessionCredentialCache,

    /// Ceiling for the token exchange (default: 300 = 5 minutes)
    token_timeout: Duration,
}

impl LoginManager {
    /// Create a manager that shares the process-wide session cache
    pub fn new(
        prompt: Arc<dyn CredentialPrompt>,
        cookies: Arc<dyn CookieCapture>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            prompt,
            cookies,
            tokens,
            cache: SessionCredentialCache::process_wide(),
            token_timeout: DEFAULT_TOKEN_TIMEOUT,
        }
    }

    /// Use a private cache instead of the process-wide one
    pub fn with_cache(mut self, cache: SessionCredentialCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_token_timeout(mut self, token_timeout: Duration) -> Self {
        self.token_timeout = token_timeout;
        self
    }

    pub fn cache(&self) -> &SessionCredentialCache {
        &self.cache
    }

    /// Resolve the method and log in, returning the kind that was used
    ///
    /// On failure the request is left exactly as it was.
    pub async fn login(&self, request: &mut SearchRequest, params: &LoginParams) -> Result<AuthKind> {
        let inputs = ResolutionInputs {
            explicit_method: params.explicit_method.clone(),
            using_preset: params.using_preset,
            preset_method: params.preset_method.clone(),
            default_method: params.default_method.clone(),
            credential_supplied: params.credential.is_some(),
            site_url: Some(request.site_url.clone()).filter(|s| !s.trim().is_empty()),
        };

        let resolution = resolver::resolve(&inputs)?;
        tracing::info!(
            "Using authentication method {} ({:?})",
            resolution.kind,
            resolution.rule
        );

        self.login_with(resolution.kind, request, params).await?;
        Ok(resolution.kind)
    }

    /// Run the strategy for an already chosen kind
    pub async fn login_with(
        &self,
        kind: AuthKind,
        request: &mut SearchRequest,
        params: &LoginParams,
    ) -> Result<()> {
        let ctx = StrategyContext {
            session: params.session,
            credential: params.credential.as_ref(),
            options: &params.options,
            prompt: self.prompt.as_ref(),
            cookies: self.cookies.as_ref(),
            tokens: self.tokens.as_ref(),
            cache: &self.cache,
            token_timeout: self.token_timeout,
        };

        match strategies::run(kind, request, &ctx).await {
            Ok(outcome) => {
                request.apply(outcome);
                tracing::info!(
                    "Authenticated with {}{}",
                    kind,
                    request
                        .username
                        .as_deref()
                        .map(|u| format!(" as {}", u))
                        .unwrap_or_default()
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!("{} login failed: {}", kind, e);
                Err(e)
            }
        }
    }
}
