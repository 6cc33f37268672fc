// Saved connection presets

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::auth::AuthMethod;
use crate::config::{expand_tilde, PRESETS_PATH_ENV};

const PRESET_EXTENSION: &str = ".json";

/// Connection settings saved by an earlier run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    #[serde(default)]
    pub site_url: Option<String>,

    #[serde(default = "default_auth_method")]
    pub authentication_type: AuthMethod,

    #[serde(default)]
    pub username: Option<String>,
}

fn default_auth_method() -> AuthMethod {
    AuthMethod::CurrentUser
}

/// Append the preset extension unless already present
pub fn preset_file_name(name: &str) -> String {
    if name.ends_with(PRESET_EXTENSION) {
        name.to_string()
    } else {
        format!("{}{}", name, PRESET_EXTENSION)
    }
}

/// Find the file for a preset name
///
/// Rooted names are used as-is. Relative names are looked up in `cwd` first,
/// then in each `;`-separated directory of `search_path`.
pub fn locate(name: &str, cwd: &Path, search_path: Option<&str>) -> Result<PathBuf> {
    let file_name = preset_file_name(name);
    let path = expand_tilde(&file_name);

    if path.is_absolute() {
        return Ok(path);
    }

    let rooted = cwd.join(&path);
    if rooted.exists() {
        return Ok(rooted);
    }

    if let Some(search_path) = search_path {
        return search_path
            .split(';')
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(|dir| expand_tilde(dir).join(&path))
            .find(|candidate| candidate.exists())
            .with_context(|| {
                format!(
                    "File \"{}\" not found in current directory or {}",
                    file_name, PRESETS_PATH_ENV
                )
            });
    }

    Ok(rooted)
}

/// Load a preset file
pub fn load(path: &Path) -> Result<Preset> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read preset: {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse preset: {}", path.display()))
}

/// Turn the `--site` argument into a site URL
///
/// URLs are returned unchanged; anything else names a saved connection whose
/// site URL is used.
pub fn resolve_site(site: &str, cwd: &Path) -> Result<String> {
    if site.starts_with("http://") || site.starts_with("https://") {
        return Ok(site.to_string());
    }

    let path = locate(site, cwd, None)?;
    if !path.exists() {
        anyhow::bail!("File not found: \"{}\"", path.display());
    }

    load(&path)?.site_url.with_context(|| {
        format!(
            "Unable to load valid saved site information from the file \"{}\"",
            path.display()
        )
    })
}
