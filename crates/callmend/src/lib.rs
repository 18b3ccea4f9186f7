//! Callmend is the message model shared by the agent pipeline.
//!
//! # Overview
//! Conversation histories are ordered sequences of [`chat::ChatMessage`]. Assistant
//! messages may request tool calls; every request is answered by a tool response
//! message carrying the same call id. This crate provides:
//!
//! - A closed, strongly typed message model
//! - Boundary parsing from provider-style JSON messages (see [`wire`])
//! - Helpers for inspecting tool-call pairing

use serde::{Deserialize, Serialize};

/// Chat message model
pub mod chat;

/// Error types and handling
pub mod error;

/// Conversion between the typed model and provider-style JSON messages
pub mod wire;

pub use chat::{ChatMessage, MessageKind, ToolResponse};
pub use error::ChatError;

/// Tool call represents a function call that an LLM wants to make.
/// This is a standardized structure used across all providers.
#[derive(Debug, Deserialize, Serialize, Clone, Eq, PartialEq)]
pub struct ToolCall {
    /// The ID of the tool call.
    pub id: String,
    /// The type of the tool call (usually "function").
    #[serde(rename = "type", default = "default_call_type")]
    pub call_type: String,
    /// The function to call.
    pub function: FunctionCall,
}

/// FunctionCall contains details about which function to call and with what arguments.
#[derive(Debug, Deserialize, Serialize, Clone, Eq, PartialEq)]
pub struct FunctionCall {
    /// The name of the function to call.
    #[serde(default)]
    pub name: String,
    /// The arguments to pass to the function, typically serialized as a JSON string.
    #[serde(default)]
    pub arguments: String,
}

fn default_call_type() -> String {
    "function".to_string()
}

impl ToolCall {
    /// Creates a function tool call.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: default_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Name of the tool this call targets.
    pub fn name(&self) -> &str {
        &self.function.name
    }
}
