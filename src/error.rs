use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for every core, model and instance operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid or missing configuration. Raised at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The store is unreachable, not connected yet, or already closed.
    #[error("connection error: {0}")]
    Connection(String),
    /// The operation is not valid in the instance's current state. No I/O was attempted.
    #[error("invalid state: {0}")]
    State(String),
    /// The store rejected a read or write.
    #[error("store error: {0}")]
    Store(String),
    /// A lifecycle hook reported a failure.
    #[error("{stage} hook `{hook}` failed: {message}")]
    Hook {
        stage: &'static str,
        hook: String,
        message: String,
    },
    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serde(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Failure reported by a [`Hooks`](crate::Hooks) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn into_error(self, stage: &'static str, hook: &str) -> Error {
        Error::Hook {
            stage,
            hook: hook.to_string(),
            message: self.message,
        }
    }
}
