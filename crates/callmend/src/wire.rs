//! Provider-style JSON messages at the edge of the typed model.
//!
//! Histories arrive from the model runtime as OpenAI-style message objects:
//!
//! ```json
//! {"role": "assistant", "content": "", "tool_calls": [
//!     {"id": "call_1", "type": "function", "function": {"name": "search", "arguments": "{}"}}
//! ]}
//! {"role": "tool", "tool_call_id": "call_1", "name": "search", "content": "..."}
//! ```
//!
//! Flat tool calls (`{"id", "name", "args"}`) are accepted as well. Everything
//! is validated here so the rest of the pipeline works on [`ChatMessage`] only.

use log::debug;
use serde_json::{Map, Value, json};

use crate::chat::{ChatMessage, MessageKind, ToolResponse};
use crate::error::ChatError;
use crate::{FunctionCall, ToolCall};

/// How shape violations are handled when parsing a history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Malformed entries become [`MessageKind::Opaque`] and pass through.
    #[default]
    Lenient,
    /// The first malformed entry fails the parse.
    Strict,
}

/// Parse a JSON array of messages.
pub fn parse_history(value: &Value, mode: ValidationMode) -> Result<Vec<ChatMessage>, ChatError> {
    let entries = value
        .as_array()
        .ok_or_else(|| ChatError::InvalidHistory("expected a JSON array of messages".into()))?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_message(index, entry, mode))
        .collect()
}

/// Parse a history from JSON text.
pub fn parse_history_str(input: &str, mode: ValidationMode) -> Result<Vec<ChatMessage>, ChatError> {
    let value: Value = serde_json::from_str(input)?;
    parse_history(&value, mode)
}

/// Parse a single message. `index` is only used for error reporting.
pub fn parse_message(
    index: usize,
    value: &Value,
    mode: ValidationMode,
) -> Result<ChatMessage, ChatError> {
    match try_parse_message(value, mode) {
        Ok(message) => Ok(message),
        Err(reason) => match mode {
            ValidationMode::Strict => Err(ChatError::malformed(index, reason)),
            ValidationMode::Lenient => {
                debug!("Keeping malformed message at index {} as opaque: {}", index, reason);
                Ok(ChatMessage::opaque(value.clone()))
            }
        },
    }
}

fn try_parse_message(value: &Value, mode: ValidationMode) -> Result<ChatMessage, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "message is not a JSON object".to_string())?;

    let role = obj
        .get("role")
        .or_else(|| obj.get("type"))
        .and_then(Value::as_str)
        .ok_or_else(|| "missing role".to_string())?;

    let id = obj.get("id").and_then(Value::as_str).map(str::to_string);
    let content = content_text(obj.get("content"));

    let kind = match role {
        "user" | "human" => MessageKind::User { content },
        "assistant" | "ai" => {
            let tool_calls = match obj.get("tool_calls") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(calls)) => parse_tool_calls(calls, mode)?,
                Some(_) => return Err("tool_calls is not an array".into()),
            };
            MessageKind::Assistant {
                content,
                tool_calls,
            }
        }
        "tool" => {
            let call_id = obj
                .get("tool_call_id")
                .and_then(Value::as_str)
                .ok_or_else(|| "tool message without tool_call_id".to_string())?;
            let tool_name = obj
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            MessageKind::Tool(ToolResponse::new(call_id, tool_name, content))
        }
        other => MessageKind::Other {
            role: other.to_string(),
            content,
        },
    };

    Ok(ChatMessage {
        id,
        kind,
        source: Some(value.clone()),
    })
}

/// Strict mode fails on the first malformed call. Lenient mode keeps the
/// well-formed calls typed so they still take part in pairing; the
/// malformed ones survive only in the message's `source`.
fn parse_tool_calls(calls: &[Value], mode: ValidationMode) -> Result<Vec<ToolCall>, String> {
    let mut parsed = Vec::with_capacity(calls.len());
    for (position, call) in calls.iter().enumerate() {
        match parse_tool_call(call, mode) {
            Ok(call) => parsed.push(call),
            Err(reason) if mode == ValidationMode::Strict => return Err(reason),
            Err(reason) => {
                debug!("Leaving tool call {} untyped: {}", position, reason);
            }
        }
    }
    Ok(parsed)
}

fn parse_tool_call(value: &Value, mode: ValidationMode) -> Result<ToolCall, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "tool call is not a JSON object".to_string())?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| "tool call without id".to_string())?;

    let call_type = obj
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("function");

    // Nested OpenAI shape first, then the flat {name, args} shape.
    let (name, arguments) = match obj.get("function").and_then(Value::as_object) {
        Some(function) => (function.get("name"), function.get("arguments")),
        None => (obj.get("name"), obj.get("args").or_else(|| obj.get("arguments"))),
    };

    let name = match name.and_then(Value::as_str) {
        Some(name) => name,
        None if mode == ValidationMode::Strict => {
            return Err(format!("tool call {} without function name", id));
        }
        None => "",
    };

    let arguments = match arguments {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    Ok(ToolCall {
        id: id.to_string(),
        call_type: call_type.to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments,
        },
    })
}

/// Text view of message content.
///
/// The text of `{"type": "text", "text": ...}` parts is joined with newlines
/// and other parts (images, audio) contribute nothing. The structured
/// original stays in the message's `source`.
fn content_text(content: Option<&Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| {
                let part = part.as_object()?;
                match part.get("type").and_then(Value::as_str) {
                    Some("text") | None => part.get("text").and_then(Value::as_str),
                    Some(_) => None,
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
    }
}

/// Render a message back into the provider-style shape.
///
/// A parsed message whose typed fields still match its `source` is emitted
/// as that source, so structured content, provider-only fields and
/// untyped tool calls pass through unchanged.
pub fn to_wire(message: &ChatMessage) -> Value {
    if let Some(source) = &message.source
        && matches_source(message, source)
    {
        return source.clone();
    }

    let mut obj = match &message.kind {
        MessageKind::Opaque { raw } => return raw.clone(),
        MessageKind::User { content } => {
            let mut obj = Map::new();
            obj.insert("role".into(), json!("user"));
            obj.insert("content".into(), json!(content));
            obj
        }
        MessageKind::Assistant {
            content,
            tool_calls,
        } => {
            let mut obj = Map::new();
            obj.insert("role".into(), json!("assistant"));
            obj.insert("content".into(), json!(content));
            if !tool_calls.is_empty() {
                obj.insert("tool_calls".into(), json!(tool_calls));
            }
            obj
        }
        MessageKind::Tool(response) => {
            let mut obj = Map::new();
            obj.insert("role".into(), json!("tool"));
            obj.insert("tool_call_id".into(), json!(response.call_id));
            obj.insert("name".into(), json!(response.tool_name));
            obj.insert("content".into(), json!(response.content));
            obj
        }
        MessageKind::Other { role, content } => {
            let mut obj = Map::new();
            obj.insert("role".into(), json!(role));
            obj.insert("content".into(), json!(content));
            obj
        }
    };

    if let Some(id) = &message.id {
        obj.insert("id".into(), json!(id));
    }
    Value::Object(obj)
}

fn matches_source(message: &ChatMessage, source: &Value) -> bool {
    try_parse_message(source, ValidationMode::Lenient)
        .is_ok_and(|parsed| parsed.id == message.id && parsed.kind == message.kind)
}

/// Render a whole history as a JSON array.
pub fn to_wire_history(messages: &[ChatMessage]) -> Value {
    Value::Array(messages.iter().map(to_wire).collect())
}
