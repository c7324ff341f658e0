//! Error types for sessions and the client factory.

use tenantpool_core::ConfigError;
use thiserror::Error;

/// Result type alias for session and capability calls.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type alias for factory construction.
pub type FactoryResult<T> = Result<T, FactoryError>;

/// Errors raised by a [`Session`](crate::Session).
///
/// The factory and pooled clients never wrap or rewrite these: whatever the
/// session returns is what the caller sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("service fault {code}: {message}")]
    Fault { code: i32, message: String },

    #[error("session is closed")]
    Closed,
}

/// Errors raised while constructing a [`ClientFactory`](crate::ClientFactory).
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl FactoryError {
    /// The rejected parameter, if this is an argument error.
    pub fn invalid_param(&self) -> Option<&'static str> {
        match self {
            Self::Config(err) => Some(err.param()),
            Self::Session(_) => None,
        }
    }
}
