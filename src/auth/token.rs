// Bounded token acquisition

use std::time::Duration;

use super::types::BearerToken;
use crate::error::{LoginError, Result};
use crate::ports::{TokenProvider, TokenRequest};

/// Longest wait for the token provider (5 minutes)
pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(300);

/// Ask the provider for a token, giving up after `ceiling`
///
/// On timeout the provider future is dropped, which cancels it at its next
/// suspension point.
pub async fn acquire_token(
    provider: &dyn TokenProvider,
    request: TokenRequest,
    ceiling: Duration,
) -> Result<BearerToken> {
    tracing::debug!(
        "Requesting management token for {} (force_interactive={}, timeout={:?})",
        request.site_url,
        request.force_interactive,
        ceiling
    );

    match tokio::time::timeout(ceiling, provider.login(request)).await {
        Err(_) => {
            tracing::warn!("Token provider did not answer within {:?}", ceiling);
            Err(LoginError::TimedOut { after: ceiling })
        }
        Ok(Err(e)) => Err(LoginError::AuthenticationFailed(format!(
            "token acquisition failed: {:#}",
            e
        ))),
        Ok(Ok(token)) if token.is_empty() => Err(LoginError::AuthenticationFailed(
            "token provider returned an empty token".to_string(),
        )),
        Ok(Ok(token)) => Ok(token),
    }
}
