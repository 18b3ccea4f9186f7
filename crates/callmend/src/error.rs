use thiserror::Error;

/// Errors raised while bringing external messages into the typed model.
#[derive(Error, Debug)]
pub enum ChatError {
    /// A history entry does not have the shape of a chat message.
    #[error("Malformed message at index {index}: {reason}")]
    MalformedMessage { index: usize, reason: String },

    /// The history itself is not a JSON array.
    #[error("Invalid history: {0}")]
    InvalidHistory(String),

    /// Handles JSON serialization and deserialization errors.
    #[error("JSON Error")]
    JsonError(#[from] serde_json::Error),
}

impl ChatError {
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        ChatError::MalformedMessage {
            index,
            reason: reason.into(),
        }
    }
}
