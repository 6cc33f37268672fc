// Terminal implementations of the login ports

use anyhow::{Context, Result};
use async_trait::async_trait;
use dialoguer::{Input, Password};
use secrecy::SecretString;
use std::sync::Mutex;

use crate::auth::{BearerToken, CookieBag, Credential};
use crate::ports::{CaptureRequest, CookieCapture, CredentialPrompt, TokenProvider, TokenRequest};

/// Username/password prompt on the terminal
pub struct DialoguerPrompt;

#[async_trait]
impl CredentialPrompt for DialoguerPrompt {
    async fn prompt(
        &self,
        message: &str,
        default_username: Option<&str>,
    ) -> Result<Option<Credential>> {
        let message = message.to_string();
        let default_username = default_username.map(str::to_string);

        tokio::task::spawn_blocking(move || prompt_credential(&message, default_username))
            .await
            .context("Credential prompt task failed")?
    }
}

fn prompt_credential(message: &str, default_username: Option<String>) -> Result<Option<Credential>> {
    println!();
    println!("{}", message);

    let mut input = Input::<String>::new()
        .with_prompt("Username")
        .allow_empty(true);
    if let Some(default_username) = default_username {
        input = input.default(default_username);
    }

    let username = input.interact_text().context("Failed to read username")?;
    if username.trim().is_empty() {
        return Ok(None);
    }

    let password = Password::new()
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read password")?;

    Ok(Some(Credential::new(username.trim(), password)))
}

/// Ask for the password of a username given on the command line
pub fn prompt_password(username: &str) -> Result<SecretString> {
    let password = Password::new()
        .with_prompt(format!("Password for {}", username))
        .allow_empty_password(true)
        .interact()
        .context("Failed to read password")?;

    Ok(SecretString::from(password))
}

/// Cookie capture where the user signs in with a browser and pastes the cookies
pub struct PastedCookieCapture;

#[async_trait]
impl CookieCapture for PastedCookieCapture {
    async fn capture(&self, request: CaptureRequest) -> Result<Option<CookieBag>> {
        tokio::task::spawn_blocking(move || -> Result<Option<CookieBag>> {
            println!();
            println!("Sign in to {} in your browser.", request.site_url);
            println!("Then copy the Cookie request header (FedAuth and rtFa) from the browser's developer tools.");
            if request.accept_invalid_certs {
                println!("Server certificate validation is disabled; your browser may warn about the certificate.");
            }

            let header = Password::new()
                .with_prompt("Cookie header")
                .allow_empty_password(true)
                .interact()
                .context("Failed to read cookie header")?;

            let bag = CookieBag::from_header(&header);
            Ok(if bag.is_empty() { None } else { Some(bag) })
        })
        .await
        .context("Cookie capture task failed")?
    }
}

/// Token provider where the user pastes an access token
///
/// The last token is reused until a forced prompt replaces it.
pub struct PastedTokenProvider {
    last_token: Mutex<Option<BearerToken>>,
}

impl PastedTokenProvider {
    pub fn new() -> Self {
        Self {
            last_token: Mutex::new(None),
        }
    }

    /// Provider that already holds a token
    pub fn with_cached(token: BearerToken) -> Self {
        Self {
            last_token: Mutex::new(Some(token)),
        }
    }

    fn cached(&self) -> Option<BearerToken> {
        self.last_token.lock().ok().and_then(|t| t.clone())
    }
}

impl Default for PastedTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for PastedTokenProvider {
    async fn login(&self, request: TokenRequest) -> Result<BearerToken> {
        if !request.force_interactive {
            if let Some(token) = self.cached() {
                tracing::debug!("Reusing cached access token");
                return Ok(token);
            }
        }

        let token = tokio::task::spawn_blocking(move || {
            println!();
            println!(
                "Sign in to {} and paste an access token for this tenant.",
                request.site_url.origin().ascii_serialization()
            );
            if let Some(ref credential) = request.credential {
                println!("Sign in as {}.", credential.username);
            }

            Password::new()
                .with_prompt("Access token")
                .interact()
                .context("Failed to read access token")
        })
        .await
        .context("Token prompt task failed")??;

        let token = BearerToken::new(token.trim());
        if let Ok(mut last) = self.last_token.lock() {
            *last = Some(token.clone());
        }

        Ok(token)
    }
}
