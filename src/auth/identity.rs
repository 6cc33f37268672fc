// Ambient process identity

use crate::error::{LoginError, Result};

/// Read the identity the process runs as, `DOMAIN\user` where a domain is known
///
/// The domain comes from `USERDOMAIN` when set, otherwise the host name.
pub fn current_identity() -> Result<String> {
    let user = std::env::var("USERNAME")
        .ok()
        .or_else(|| std::env::var("USER").ok());
    let domain = std::env::var("USERDOMAIN").ok();
    let host = hostname::get().ok().and_then(|h| h.into_string().ok());

    identity_from(user, domain, host)
}

fn identity_from(
    user: Option<String>,
    domain: Option<String>,
    host: Option<String>,
) -> Result<String> {
    let user = user
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            LoginError::EnvironmentFailure(
                "cannot read the current identity: neither USERNAME nor USER is set".to_string(),
            )
        })?;

    let domain = domain
        .or(host)
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    Ok(match domain {
        Some(domain) => format!("{}\\{}", domain, user),
        None => user,
    })
}
