//! Incremental transcript of a conversation history
//!
//! Each run hands back the whole authoritative history. `MessageTracker`
//! remembers which message ids were already surfaced so callers only show
//! what is new. Messages without an id cannot be tracked and are always
//! reported.

use callmend::chat::{ChatMessage, MessageKind};
use std::collections::HashSet;
use std::fmt;

/// Seen-id set for surfacing only new messages across runs
#[derive(Debug, Default)]
pub struct MessageTracker {
    seen: HashSet<String>,
}

impl MessageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages of `history` not reported before, in order
    pub fn observe<'a>(&mut self, history: &'a [ChatMessage]) -> Vec<&'a ChatMessage> {
        history
            .iter()
            .filter(|msg| match &msg.id {
                Some(id) => self.seen.insert(id.clone()),
                None => true,
            })
            .collect()
    }

    /// Returns the printable entries for the unseen messages of `history`
    pub fn entries<'a>(&mut self, history: &'a [ChatMessage]) -> Vec<TranscriptEntry<'a>> {
        self.observe(history)
            .into_iter()
            .flat_map(TranscriptEntry::from_message)
            .collect()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

/// One printable line of a transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry<'a> {
    ToolCall { name: &'a str, arguments: &'a str },
    ToolResponse { name: &'a str, content: &'a str },
    Reply(&'a str),
    Other { role: &'a str, content: &'a str },
}

impl<'a> TranscriptEntry<'a> {
    /// User messages produce no entries; the caller already has them.
    pub fn from_message(message: &'a ChatMessage) -> Vec<Self> {
        match &message.kind {
            MessageKind::User { .. } => Vec::new(),
            MessageKind::Assistant {
                content,
                tool_calls,
            } => {
                let mut entries: Vec<Self> = tool_calls
                    .iter()
                    .map(|call| TranscriptEntry::ToolCall {
                        name: call.name(),
                        arguments: &call.function.arguments,
                    })
                    .collect();
                if !content.is_empty() {
                    entries.push(TranscriptEntry::Reply(content));
                }
                entries
            }
            MessageKind::Tool(response) => {
                let name: &str = if response.tool_name.is_empty() {
                    "tool"
                } else {
                    response.tool_name.as_str()
                };
                vec![TranscriptEntry::ToolResponse {
                    name,
                    content: &response.content,
                }]
            }
            MessageKind::Other { role, content } => vec![TranscriptEntry::Other { role, content }],
            MessageKind::Opaque { .. } => vec![TranscriptEntry::Other {
                role: "opaque",
                content: "",
            }],
        }
    }
}

impl fmt::Display for TranscriptEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptEntry::ToolCall { name, arguments } => {
                write!(f, "TOOL CALL [{}]: {}", name, arguments)
            }
            TranscriptEntry::ToolResponse { name, content } => {
                write!(f, "TOOL RESPONSE [{}]: {}", name, content)
            }
            TranscriptEntry::Reply(content) => write!(f, "AI: {}", content),
            TranscriptEntry::Other { role, content } => write!(f, "[{}]: {}", role, content),
        }
    }
}
