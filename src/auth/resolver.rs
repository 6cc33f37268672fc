// Authentication method resolution

use url::Url;

use super::types::{AuthKind, AuthMethod};
use crate::error::{LoginError, MethodSource, Result};

/// Host suffix of SharePoint Online tenants
pub const CLOUD_HOST_SUFFIX: &str = "sharepoint.com";

/// Read-only snapshot of everything resolution looks at
#[derive(Debug, Clone, Default)]
pub struct ResolutionInputs {
    /// `--auth-method` from the command line
    pub explicit_method: Option<AuthMethod>,

    /// True when a saved preset was loaded
    pub using_preset: bool,

    /// Method recorded in the preset (only read when `using_preset`)
    pub preset_method: Option<AuthMethod>,

    /// Process-wide default, usually from the environment
    pub default_method: Option<AuthMethod>,

    /// True when an explicit username/password was supplied
    pub credential_supplied: bool,

    pub site_url: Option<String>,
}

/// Which precedence rule produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionRule {
    Explicit,
    Preset,
    EnvironmentDefault,
    HostnameGuess,
    Fallback,
}

/// Result of method resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub kind: AuthKind,
    pub rule: ResolutionRule,
}

/// Pick the login strategy
///
/// Precedence, first match wins:
/// 1. Explicit override
/// 2. Preset recorded method (when a preset was loaded)
/// 3. Process-wide default
/// 4. Guess from the site host name
/// 5. Current identity
pub fn resolve(inputs: &ResolutionInputs) -> Result<Resolution> {
    let resolution = if let Some(ref method) = inputs.explicit_method {
        Resolution {
            kind: supported_kind(method, MethodSource::Explicit)?,
            rule: ResolutionRule::Explicit,
        }
    } else if inputs.using_preset {
        // Presets without a recorded method behave like the request default
        let method = inputs
            .preset_method
            .clone()
            .unwrap_or(AuthMethod::CurrentUser);
        Resolution {
            kind: supported_kind(&method, MethodSource::Preset)?,
            rule: ResolutionRule::Preset,
        }
    } else if let Some(ref method) = inputs.default_method {
        Resolution {
            kind: supported_kind(method, MethodSource::Environment)?,
            rule: ResolutionRule::EnvironmentDefault,
        }
    } else if let Some(kind) = guess(inputs.site_url.as_deref(), inputs.credential_supplied) {
        Resolution {
            kind,
            rule: ResolutionRule::HostnameGuess,
        }
    } else {
        Resolution {
            kind: AuthKind::CurrentIdentity,
            rule: ResolutionRule::Fallback,
        }
    };

    tracing::debug!(
        "Resolved authentication method {} via {:?}",
        resolution.kind,
        resolution.rule
    );

    Ok(resolution)
}

fn supported_kind(method: &AuthMethod, origin: MethodSource) -> Result<AuthKind> {
    method
        .kind()
        .ok_or_else(|| LoginError::unsupported(method.to_string(), origin))
}

/// Guess the method from the site host name
///
/// Returns `None` when the URL is missing or not absolute.
pub fn guess(site_url: Option<&str>, credential_supplied: bool) -> Option<AuthKind> {
    let site_url = site_url?.trim();
    if site_url.is_empty() {
        return None;
    }

    let url = Url::parse(site_url).ok()?;
    let host = url.host_str()?;

    if host.to_lowercase().ends_with(CLOUD_HOST_SUFFIX) {
        Some(AuthKind::ManagementToken)
    } else if credential_supplied {
        Some(AuthKind::NetworkCredential)
    } else {
        Some(AuthKind::CurrentIdentity)
    }
}
