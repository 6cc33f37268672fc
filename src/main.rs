use anyhow::{Context, Result};
use std::sync::Arc;

use spsearch_login::auth::{
    CredentialMaterial, Credential, LoginManager, LoginOptions, LoginParams, SearchRequest,
    SessionId,
};
use spsearch_login::config::Config;
use spsearch_login::interactive::{
    self, DialoguerPrompt, PastedCookieCapture, PastedTokenProvider,
};
use spsearch_login::{preset, report};

const COMMAND_NAME: &str = "spsearch-login";

#[tokio::main]
async fn main() {
    let config = match Config::load().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    };

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!("Enter {}", COMMAND_NAME);

    if let Err(e) = run(config).await {
        tracing::error!("❌ {:#}", e);

        // Always keep the last error on disk with as much detail as possible
        match report::write_error_details(&report::diagnostics_dir(), COMMAND_NAME, &e) {
            Ok(path) => tracing::warn!("Error details were written to {}", path.display()),
            Err(report_err) => {
                tracing::warn!("Failed to write error details to file: {:#}", report_err)
            }
        }

        // Exit directly: an abandoned prompt thread must not keep the runtime alive
        std::process::exit(1);
    }

    std::process::exit(0);
}

async fn run(config: Config) -> Result<()> {
    let cwd = config.working_dir()?;

    if config.skip_server_certificate_validation {
        tracing::warn!("Server certificate validation is disabled");
    }

    // Load preset
    let preset = match config.preset {
        Some(ref name) => {
            let path = preset::locate(name, &cwd, config.presets_path.as_deref())?;
            tracing::info!("Loading preset {}", path.display());
            Some(preset::load(&path)?)
        }
        None => None,
    };

    // Command line site overrides the preset
    let site_url = match config.site {
        Some(ref site) => Some(preset::resolve_site(site, &cwd)?),
        None => preset.as_ref().and_then(|p| p.site_url.clone()),
    }
    .context("No site URL: use --site or a preset that records one")?;

    let mut request = SearchRequest::new(site_url);
    request.username = preset.as_ref().and_then(|p| p.username.clone());

    let credential = match (config.username.clone(), config.password.clone()) {
        (Some(username), Some(password)) => Some(Credential { username, password }),
        (Some(username), None) => {
            let prompt_for = username.clone();
            let password = tokio::task::spawn_blocking(move || interactive::prompt_password(&prompt_for))
                .await
                .context("Password prompt task failed")??;
            Some(Credential { username, password })
        }
        (None, _) => None,
    };

    let params = LoginParams {
        session: SessionId::new(),
        explicit_method: config.explicit_method.clone(),
        using_preset: preset.is_some(),
        preset_method: preset.map(|p| p.authentication_type),
        default_method: config.default_method.clone(),
        credential,
        options: LoginOptions {
            force_login_prompt: config.force_login_prompt,
            skip_server_certificate_validation: config.skip_server_certificate_validation,
        },
    };

    let manager = LoginManager::new(
        Arc::new(DialoguerPrompt),
        Arc::new(PastedCookieCapture),
        Arc::new(PastedTokenProvider::new()),
    )
    .with_token_timeout(config.token_timeout);

    let kind = manager
        .login(&mut request, &params)
        .await
        .with_context(|| format!("Login to {} failed", request.site_url))?;

    println!();
    println!("  Site:        {}", request.site_url);
    println!("  Method:      {}", kind);
    println!(
        "  User:        {}",
        request.username.as_deref().unwrap_or("(not set)")
    );
    println!("  Credential:  {}", describe_material(request.material()));
    println!();

    Ok(())
}

fn describe_material(material: Option<&CredentialMaterial>) -> String {
    match material {
        None => "ambient identity".to_string(),
        Some(CredentialMaterial::Password(_)) => "password".to_string(),
        Some(CredentialMaterial::Cookies(bag)) => format!("cookies ({})", bag.names().join(", ")),
        Some(CredentialMaterial::Token(_)) => "bearer token".to_string(),
    }
}
