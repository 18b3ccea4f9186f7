//! Structured error type for the agent crate.
//!
//! History repair itself never fails; these errors come from the
//! surrounding surfaces: history parsing, middleware, config, and the
//! model step.

use callmend::ChatError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured, serializable error type for the agent crate.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AgentError {
    // --- Configuration / Setup ---
    #[error("invalid config: {0}")]
    Config(String),

    #[error("unknown middleware type: {name}")]
    UnknownMiddleware { name: String },

    // --- History ---
    #[error("malformed message at index {index}: {reason}")]
    MalformedMessage { index: usize, reason: String },

    #[error("invalid history: {0}")]
    InvalidHistory(String),

    // --- Middleware ---
    #[error("middleware error: {0}")]
    Middleware(String),

    // --- Model ---
    #[error("model step failed: {0}")]
    ModelStep(String),

    // --- Serialization ---
    #[error("serialization error: {0}")]
    Serialization(String),

    // --- Generic internal ---
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AgentError {
    fn from(e: anyhow::Error) -> Self {
        AgentError::Internal(format!("{:#}", e))
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Serialization(e.to_string())
    }
}

impl From<ChatError> for AgentError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::MalformedMessage { index, reason } => {
                AgentError::MalformedMessage { index, reason }
            }
            ChatError::InvalidHistory(reason) => AgentError::InvalidHistory(reason),
            ChatError::JsonError(e) => AgentError::Serialization(e.to_string()),
        }
    }
}

impl From<crate::middleware::error::MiddlewareError> for AgentError {
    fn from(e: crate::middleware::error::MiddlewareError) -> Self {
        AgentError::Middleware(e.to_string())
    }
}
