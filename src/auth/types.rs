// Authentication types

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Login strategy actually executed against the search service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthKind {
    /// Ambient identity of the running process (integrated auth)
    CurrentIdentity,

    /// Explicit username/password negotiated by the server (NTLM/Kerberos)
    NetworkCredential,

    /// SharePoint Online cookies captured from an interactive sign-in
    LegacyCookie,

    /// OAuth bearer token from the management token provider
    ManagementToken,
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthKind::CurrentIdentity => write!(f, "CurrentIdentity"),
            AuthKind::NetworkCredential => write!(f, "NetworkCredential"),
            AuthKind::LegacyCookie => write!(f, "LegacyCookie"),
            AuthKind::ManagementToken => write!(f, "ManagementToken"),
        }
    }
}

/// Authentication method as requested on the command line or recorded in a preset
///
/// This is wider than [`AuthKind`]: presets may record types that have no
/// login strategy, and free-form input is kept verbatim so it can be named in
/// the error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthMethod {
    CurrentUser,
    Windows,
    Spo,
    SpoManagement,
    Anonymous,
    Forefront,
    Forms,
    Unknown(String),
}

impl AuthMethod {
    /// Strategy for this method, if one exists
    pub fn kind(&self) -> Option<AuthKind> {
        match self {
            AuthMethod::CurrentUser => Some(AuthKind::CurrentIdentity),
            AuthMethod::Windows => Some(AuthKind::NetworkCredential),
            AuthMethod::Spo => Some(AuthKind::LegacyCookie),
            AuthMethod::SpoManagement => Some(AuthKind::ManagementToken),
            AuthMethod::Anonymous
            | AuthMethod::Forefront
            | AuthMethod::Forms
            | AuthMethod::Unknown(_) => None,
        }
    }
}

impl From<AuthKind> for AuthMethod {
    fn from(kind: AuthKind) -> Self {
        match kind {
            AuthKind::CurrentIdentity => AuthMethod::CurrentUser,
            AuthKind::NetworkCredential => AuthMethod::Windows,
            AuthKind::LegacyCookie => AuthMethod::Spo,
            AuthKind::ManagementToken => AuthMethod::SpoManagement,
        }
    }
}

impl FromStr for AuthMethod {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.trim().to_lowercase().as_str() {
            "currentuser" | "currentidentity" => AuthMethod::CurrentUser,
            "windows" | "networkcredential" => AuthMethod::Windows,
            "spo" | "legacycookie" => AuthMethod::Spo,
            "spomanagement" | "managementtoken" => AuthMethod::SpoManagement,
            "anonymous" => AuthMethod::Anonymous,
            "forefront" => AuthMethod::Forefront,
            "forms" => AuthMethod::Forms,
            _ => AuthMethod::Unknown(s.trim().to_string()),
        };
        Ok(method)
    }
}

impl From<String> for AuthMethod {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

impl From<AuthMethod> for String {
    fn from(method: AuthMethod) -> Self {
        method.to_string()
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::CurrentUser => write!(f, "CurrentUser"),
            AuthMethod::Windows => write!(f, "Windows"),
            AuthMethod::Spo => write!(f, "SPO"),
            AuthMethod::SpoManagement => write!(f, "SPOManagement"),
            AuthMethod::Anonymous => write!(f, "Anonymous"),
            AuthMethod::Forefront => write!(f, "Forefront"),
            AuthMethod::Forms => write!(f, "Forms"),
            AuthMethod::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Identifies one logical session sharing captured cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Username and password supplied by the user
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub password: SecretString,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Single captured session cookie
#[derive(Debug, Clone)]
pub struct Cookie {
    pub name: String,
    pub value: SecretString,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: SecretString::from(value.into()),
        }
    }
}

/// Cookies captured by an interactive sign-in
#[derive(Debug, Clone, Default)]
pub struct CookieBag {
    cookies: Vec<Cookie>,
}

impl CookieBag {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self { cookies }
    }

    /// Parse a `Cookie` request header (`name=value; name2=value2`)
    ///
    /// Segments without `=` or with an empty name are skipped.
    pub fn from_header(header: &str) -> Self {
        let cookies = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some(Cookie::new(name, value.trim()))
            })
            .collect();
        Self { cookies }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.cookies.iter().map(|c| c.name.as_str()).collect()
    }

    /// Value for an outbound `Cookie` header
    pub fn header_value(&self) -> SecretString {
        let joined = self
            .cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value.expose_secret()))
            .collect::<Vec<_>>()
            .join("; ");
        SecretString::from(joined)
    }
}

/// OAuth bearer token
#[derive(Debug, Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().trim().is_empty()
    }

    /// Value for an outbound `Authorization` header
    pub fn authorization_header(&self) -> SecretString {
        SecretString::from(format!("Bearer {}", self.0.expose_secret()))
    }
}

impl ExposeSecret<str> for BearerToken {
    fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Credential material attached to the request by a successful login
#[derive(Debug, Clone)]
pub enum CredentialMaterial {
    Password(SecretString),
    Cookies(CookieBag),
    Token(BearerToken),
}

/// Search request as far as authentication is concerned
///
/// Owned by the caller; a login only ever replaces the auth fields as a unit.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub site_url: String,
    pub username: Option<String>,
    auth_kind: Option<AuthKind>,
    material: Option<CredentialMaterial>,
}

impl SearchRequest {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            ..Self::default()
        }
    }

    /// Kind of the last successful login, if any
    pub fn auth_kind(&self) -> Option<AuthKind> {
        self.auth_kind
    }

    pub fn material(&self) -> Option<&CredentialMaterial> {
        self.material.as_ref()
    }

    pub fn secret(&self) -> Option<&SecretString> {
        match &self.material {
            Some(CredentialMaterial::Password(secret)) => Some(secret),
            _ => None,
        }
    }

    pub fn cookies(&self) -> Option<&CookieBag> {
        match &self.material {
            Some(CredentialMaterial::Cookies(bag)) => Some(bag),
            _ => None,
        }
    }

    pub fn token(&self) -> Option<&BearerToken> {
        match &self.material {
            Some(CredentialMaterial::Token(token)) => Some(token),
            _ => None,
        }
    }

    /// Replace kind and material with the outcome of a login
    ///
    /// The username is only overwritten when the outcome carries one, so a
    /// cookie or token login keeps the username of an earlier login.
    pub(crate) fn apply(&mut self, outcome: LoginOutcome) {
        self.auth_kind = Some(outcome.kind);
        if let Some(username) = outcome.username {
            self.username = Some(username);
        }
        self.material = outcome.material;
    }
}

/// Everything a strategy produced, applied to the request in one step
#[derive(Debug)]
pub(crate) struct LoginOutcome {
    pub kind: AuthKind,
    pub username: Option<String>,
    pub material: Option<CredentialMaterial>,
}

/// Per-call switches consumed by the login flows
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    /// Ask the token provider to bypass any cached token
    pub force_login_prompt: bool,

    /// Passed to capture and token flows that open their own connections
    pub skip_server_certificate_validation: bool,
}
