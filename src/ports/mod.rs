pub mod cookies;
pub mod credentials;
pub mod token;

pub use cookies::{CaptureRequest, CookieCapture};
pub use credentials::CredentialPrompt;
pub use token::{TokenProvider, TokenRequest};
