use crate::auth::{BearerToken, Credential};
use async_trait::async_trait;
use url::Url;

/// Token exchange parameters
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub site_url: Url,

    /// Skip any silently cached token and show the consent/login prompt
    pub force_interactive: bool,

    /// Explicit user credential, when the user supplied one
    pub credential: Option<Credential>,

    pub accept_invalid_certs: bool,
}

/// Port for the OAuth token exchange
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Acquire a bearer token for the site
    ///
    /// May take arbitrarily long; callers bound the wait themselves.
    async fn login(&self, request: TokenRequest) -> anyhow::Result<BearerToken>;
}
