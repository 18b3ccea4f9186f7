use thiserror::Error;

/// Errors that can occur during middleware state transitions
#[derive(Error, Debug)]
pub enum MiddlewareError {
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MiddlewareError>;
