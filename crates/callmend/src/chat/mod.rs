use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ToolCall;

/// Role of a participant in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    /// The user/human participant in the conversation
    User,
    /// The AI assistant participant in the conversation
    Assistant,
    /// A tool answering an assistant's tool call
    Tool,
    /// Any other role (system, developer, ...), or an entry that could not be classified
    Other,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
            ChatRole::Tool => write!(f, "tool"),
            ChatRole::Other => write!(f, "other"),
        }
    }
}

/// The result of a tool call, addressed to the call that requested it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Id of the tool call this message answers
    pub call_id: String,
    /// Name of the tool that was called
    pub tool_name: String,
    /// Tool output
    pub content: String,
}

impl ToolResponse {
    pub fn new(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
        }
    }
}

/// The payload of a message, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    /// A message written by the user
    User { content: String },
    /// A model reply, possibly requesting tool calls
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// A tool response
    Tool(ToolResponse),
    /// System prompts and other roles that take no part in tool pairing
    Other { role: String, content: String },
    /// An entry that failed validation at the boundary, kept verbatim
    Opaque { raw: serde_json::Value },
}

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Identity assigned by whoever produced the message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub kind: MessageKind,
    /// Provider-shaped object this message was parsed from. Rendered back
    /// verbatim while the typed fields still match it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<serde_json::Value>,
}

impl ChatMessage {
    /// Create a new builder for a user message
    pub fn user() -> ChatMessageBuilder {
        ChatMessageBuilder::new(BuilderRole::User)
    }

    /// Create a new builder for an assistant message
    pub fn assistant() -> ChatMessageBuilder {
        ChatMessageBuilder::new(BuilderRole::Assistant)
    }

    /// Create a new builder for a system (or other role) message
    pub fn other(role: impl Into<String>) -> ChatMessageBuilder {
        ChatMessageBuilder::new(BuilderRole::Other(role.into()))
    }

    /// Wrap a tool response in a message with no identity
    pub fn tool(response: ToolResponse) -> Self {
        Self {
            id: None,
            kind: MessageKind::Tool(response),
            source: None,
        }
    }

    /// Keep an unvalidated entry as-is
    pub fn opaque(raw: serde_json::Value) -> Self {
        Self {
            id: None,
            kind: MessageKind::Opaque { raw },
            source: None,
        }
    }

    /// Attach an identity to this message
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn role(&self) -> ChatRole {
        match &self.kind {
            MessageKind::User { .. } => ChatRole::User,
            MessageKind::Assistant { .. } => ChatRole::Assistant,
            MessageKind::Tool(_) => ChatRole::Tool,
            MessageKind::Other { .. } | MessageKind::Opaque { .. } => ChatRole::Other,
        }
    }

    /// Text content of the message. Opaque entries have none.
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::User { content }
            | MessageKind::Assistant { content, .. }
            | MessageKind::Other { content, .. } => Some(content),
            MessageKind::Tool(response) => Some(&response.content),
            MessageKind::Opaque { .. } => None,
        }
    }

    /// Tool calls requested by this message. Empty for anything but assistant messages.
    pub fn tool_calls(&self) -> &[ToolCall] {
        match &self.kind {
            MessageKind::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    /// The tool response carried by this message, if it is one
    pub fn tool_response(&self) -> Option<&ToolResponse> {
        match &self.kind {
            MessageKind::Tool(response) => Some(response),
            _ => None,
        }
    }

    /// Returns true if this is a tool response answering `call_id`
    pub fn answers(&self, call_id: &str) -> bool {
        self.tool_response()
            .is_some_and(|response| response.call_id == call_id)
    }
}

/// Roles a builder can produce. Tool responses need a call id and are
/// built with [`ChatMessage::tool`].
#[derive(Debug)]
enum BuilderRole {
    User,
    Assistant,
    Other(String),
}

/// Builder for ChatMessage
#[derive(Debug)]
pub struct ChatMessageBuilder {
    role: BuilderRole,
    id: Option<String>,
    content: String,
    tool_calls: Vec<ToolCall>,
}

impl ChatMessageBuilder {
    fn new(role: BuilderRole) -> Self {
        Self {
            role,
            id: None,
            content: String::new(),
            tool_calls: Vec::new(),
        }
    }

    /// Set the message identity
    pub fn id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the message content
    pub fn content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = content.into();
        self
    }

    /// Set the tool calls requested by an assistant message
    pub fn tool_use(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    /// Build the ChatMessage
    ///
    /// Tool calls are dropped for anything but assistant messages.
    pub fn build(self) -> ChatMessage {
        let kind = match self.role {
            BuilderRole::User => MessageKind::User {
                content: self.content,
            },
            BuilderRole::Assistant => MessageKind::Assistant {
                content: self.content,
                tool_calls: self.tool_calls,
            },
            BuilderRole::Other(role) => MessageKind::Other {
                role,
                content: self.content,
            },
        };
        ChatMessage {
            id: self.id,
            kind,
            source: None,
        }
    }
}
