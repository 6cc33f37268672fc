use crate::auth::{AuthKind, CookieBag};
use async_trait::async_trait;
use url::Url;

/// What the capture flow should sign in to
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub site_url: Url,
    pub style: AuthKind,
    pub accept_invalid_certs: bool,
}

/// Port for capturing session cookies through an interactive sign-in
#[async_trait]
pub trait CookieCapture: Send + Sync {
    /// Run the sign-in and return the captured cookies
    ///
    /// Returns None when the flow finished without cookies.
    async fn capture(&self, request: CaptureRequest) -> anyhow::Result<Option<CookieBag>>;
}
