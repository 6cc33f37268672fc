// Authentication module
// Resolves the login method and runs the matching strategy

mod cache;
mod identity;
mod manager;
mod resolver;
mod strategies;
mod token;
mod types;

pub use cache::SessionCredentialCache;
pub use identity::current_identity;
pub use manager::{LoginManager, LoginParams};
pub use resolver::{guess, resolve, Resolution, ResolutionInputs, ResolutionRule, CLOUD_HOST_SUFFIX};
pub use token::{acquire_token, DEFAULT_TOKEN_TIMEOUT};
pub use types::{
    AuthKind, AuthMethod, BearerToken, Cookie, CookieBag, Credential, CredentialMaterial,
    LoginOptions, SearchRequest, SessionId,
};
