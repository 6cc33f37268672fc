// Error handling module
// Defines the login error taxonomy and its reporting category

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Where an unsupported authentication method came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodSource {
    /// `--auth-method` on the command line
    Explicit,
    /// Method recorded in a loaded preset
    Preset,
    /// Process-wide default from the environment
    Environment,
}

impl fmt::Display for MethodSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodSource::Explicit => write!(f, "command line"),
            MethodSource::Preset => write!(f, "preset"),
            MethodSource::Environment => write!(f, "environment default"),
        }
    }
}

/// Errors that end a login attempt
///
/// Every variant is terminal: nothing in this crate retries on its own.
#[derive(Error, Debug, Clone)]
pub enum LoginError {
    /// The requested method names an authentication type that has no strategy
    #[error(
        "Authentication method {method} ({origin}) is not supported. You can override it on the command line with --auth-method."
    )]
    UnsupportedMethod {
        method: String,
        origin: MethodSource,
    },

    /// A capture or credential negotiation finished without usable material
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The bounded token acquisition wait elapsed
    #[error("Prompt for user credentials timed out after {}", format_duration(.after))]
    TimedOut { after: Duration },

    /// The ambient identity or environment could not be read
    #[error("Environment failure: {0}")]
    EnvironmentFailure(String),
}

/// Coarse classification used when reporting a failure to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    AuthenticationError,
    PermissionDenied,
    NotImplemented,
    OperationTimeout,
    NotSpecified,
}

impl LoginError {
    pub fn unsupported(method: impl Into<String>, origin: MethodSource) -> Self {
        LoginError::UnsupportedMethod {
            method: method.into(),
            origin,
        }
    }

    /// Classify the error for user-facing reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            LoginError::AuthenticationFailed(msg) => {
                if msg.contains("HTTP 401: Unauthorized") || msg.contains("HTTP 403: Forbidden") {
                    ErrorCategory::PermissionDenied
                } else {
                    ErrorCategory::AuthenticationError
                }
            }
            LoginError::UnsupportedMethod { .. } => ErrorCategory::NotImplemented,
            LoginError::TimedOut { .. } => ErrorCategory::OperationTimeout,
            LoginError::EnvironmentFailure(_) => ErrorCategory::NotSpecified,
        }
    }
}

fn format_duration(d: &Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        if minutes == 1 {
            "1 minute".to_string()
        } else {
            format!("{} minutes", minutes)
        }
    } else if secs > 0 {
        format!("{} seconds", secs)
    } else {
        format!("{} ms", d.as_millis())
    }
}

/// Result type alias for login operations
pub type Result<T> = std::result::Result<T, LoginError>;
