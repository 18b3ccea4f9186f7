//! Helper functions for creating test fixtures

use crate::middleware::{AgentStats, ConversationContext};
use callmend::ToolCall;
use callmend::chat::{ChatMessage, ToolResponse};
use std::sync::Arc;

/// Creates an empty test conversation context with the given session ID and step count
pub fn test_context(session_id: &str, steps: usize) -> Arc<ConversationContext> {
    Arc::new(ConversationContext::new(
        session_id.into(),
        Arc::from([]),
        Arc::new(AgentStats {
            steps,
            ..Default::default()
        }),
        "mock".into(),
        "mock-model".into(),
    ))
}

/// Creates a test conversation context holding `messages`
pub fn test_context_with_messages(
    session_id: &str,
    messages: Vec<ChatMessage>,
) -> Arc<ConversationContext> {
    Arc::new(ConversationContext::new(
        session_id.into(),
        Arc::from(messages.into_boxed_slice()),
        Arc::new(AgentStats::default()),
        "mock".into(),
        "mock-model".into(),
    ))
}

pub fn user(content: &str) -> ChatMessage {
    ChatMessage::user().content(content).build()
}

pub fn other(role: &str, content: &str) -> ChatMessage {
    ChatMessage::other(role).content(content).build()
}

/// Creates an assistant message requesting `(call_id, tool_name)` calls
pub fn assistant_with_calls(calls: &[(&str, &str)]) -> ChatMessage {
    ChatMessage::assistant()
        .tool_use(
            calls
                .iter()
                .map(|(id, name)| ToolCall::function(*id, *name, "{}"))
                .collect(),
        )
        .build()
}

pub fn tool_response(call_id: &str, tool_name: &str, content: &str) -> ChatMessage {
    ChatMessage::tool(ToolResponse::new(call_id, tool_name, content))
}

/// Route `log` and `tracing` output to the test writer. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_log::LogTracer::init();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
