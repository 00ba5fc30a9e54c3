use std::fmt;

/// Unified error type for the quire-core crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A save was requested for a file-backed document that has no path and
    /// no target was supplied. The caller must obtain a path and retry.
    SaveTargetRequired,
    /// Invalid input provided by the caller.
    InvalidInput(String),
    /// Internal error.
    Internal(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::SaveTargetRequired => write!(f, "save target required"),
            CoreError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            CoreError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;
