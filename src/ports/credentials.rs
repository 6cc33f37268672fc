use crate::auth::Credential;
use async_trait::async_trait;

/// Port for asking the user for a username and password
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    /// Prompt for credentials, pre-filling `default_username` when known
    ///
    /// Blocks until the user answers. Returns None if the user gave nothing.
    async fn prompt(
        &self,
        message: &str,
        default_username: Option<&str>,
    ) -> anyhow::Result<Option<Credential>>;
}
