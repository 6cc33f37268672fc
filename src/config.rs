use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::AuthMethod;

/// Environment variable holding the process-wide default authentication method
pub const DEFAULT_METHOD_ENV: &str = "SPSEARCH_AUTH_METHOD";

/// Environment variable listing preset directories, `;`-separated
pub const PRESETS_PATH_ENV: &str = "SPSEARCH_PRESETS_PATH";

/// SharePoint search login - resolve the authentication method and sign in
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// SharePoint site to connect to. http(s):// URLs are used directly, other values name a saved preset
    #[arg(short, long)]
    pub site: Option<String>,

    /// Load parameters from a saved preset
    #[arg(short, long, visible_alias = "load-preset")]
    pub preset: Option<String>,

    /// Authentication method (CurrentUser, Windows, SPO, SPOManagement). Overrides the preset
    #[arg(short, long)]
    pub auth_method: Option<String>,

    /// Username for Windows or SPOManagement authentication
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password for --username (prompted when missing)
    #[arg(long, env = "SPSEARCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Force a login prompt when using SPOManagement
    #[arg(long)]
    pub force_login_prompt: bool,

    /// Skip validation of the server's SSL certificate
    #[arg(long)]
    pub skip_server_certificate_validation: bool,

    /// Token acquisition timeout in seconds
    #[arg(long, env = "SPSEARCH_TOKEN_TIMEOUT", default_value = "300")]
    pub token_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Target
    pub site: Option<String>,
    pub preset: Option<String>,
    pub presets_path: Option<String>,

    // Authentication
    pub explicit_method: Option<AuthMethod>,
    pub default_method: Option<AuthMethod>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub force_login_prompt: bool,
    pub skip_server_certificate_validation: bool,

    // Timeouts
    pub token_timeout: Duration,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();

        Ok(Self::from_args(
            args,
            std::env::var(DEFAULT_METHOD_ENV).ok(),
            std::env::var(PRESETS_PATH_ENV).ok(),
        ))
    }

    /// Build configuration from parsed arguments and environment values
    ///
    /// The environment default is kept apart from `--auth-method` so the
    /// resolver can rank the two differently.
    pub fn from_args(
        args: CliArgs,
        default_method: Option<String>,
        presets_path: Option<String>,
    ) -> Self {
        Config {
            site: non_empty(args.site),
            preset: non_empty(args.preset),
            presets_path: non_empty(presets_path),

            explicit_method: parse_auth_method(args.auth_method),
            default_method: parse_auth_method(default_method),
            username: non_empty(args.username),
            password: args.password.map(SecretString::from),
            force_login_prompt: args.force_login_prompt,
            skip_server_certificate_validation: args.skip_server_certificate_validation,

            token_timeout: Duration::from_secs(args.token_timeout),

            log_level: args.log_level,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.site.is_none() && self.preset.is_none() {
            anyhow::bail!("Either --site or --preset is required");
        }

        if self.password.is_some() && self.username.is_none() {
            anyhow::bail!("--password requires --username");
        }

        if self.token_timeout.is_zero() {
            anyhow::bail!("SPSEARCH_TOKEN_TIMEOUT must be greater than zero");
        }

        Ok(())
    }

    /// Current working directory used for preset lookup
    pub fn working_dir(&self) -> Result<PathBuf> {
        std::env::current_dir().context("Failed to read the current directory")
    }
}

/// Expand tilde (~) in file paths to user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse an authentication method, treating blank values as unset
fn parse_auth_method(value: Option<String>) -> Option<AuthMethod> {
    non_empty(value).map(AuthMethod::from)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
