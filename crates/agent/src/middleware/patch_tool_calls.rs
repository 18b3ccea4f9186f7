//! Dangling tool-call repair
//!
//! An assistant message can request tool calls that never get a response: the
//! run was interrupted, the user spoke up, or the turn was abandoned. Handing
//! such a history back to a model fails, since every tool call must be
//! answered by a tool message. This middleware walks the history at the start
//! of each run and inserts a cancellation response right after the assistant
//! message for every call that is not answered anywhere later.
//!
//! The repaired history replaces the context's history in full
//! ([`HistoryUpdate::Overwrite`]). Appending instead would keep the
//! unanswered calls in place.
//!
//! # Example (TOML config)
//!
//! ```toml
//! [[middleware]]
//! type = "patch_tool_calls"
//! # enabled defaults to true
//! ```

use async_trait::async_trait;
use callmend::chat::{ChatMessage, ToolResponse};
use log::{debug, trace, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use super::{ExecutionState, HistoryUpdate, MiddlewareDriver, MiddlewareError, Result};
use crate::middleware::factory::MiddlewareFactory;

/// Content of a synthesized response for the call `call_id` to `tool_name`.
pub fn cancellation_notice(tool_name: &str, call_id: &str) -> String {
    format!(
        "Tool call {} with id {} was cancelled - another message came in before it could be completed.",
        tool_name, call_id
    )
}

/// A tool response inserted by the repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticResponse {
    /// Index in the input history of the assistant message that issued the call
    pub after_index: usize,
    pub call_id: String,
    pub tool_name: String,
}

/// What a repair pass found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Tool calls seen across all assistant messages
    pub inspected_calls: usize,
    /// Responses inserted, in output order
    pub synthesized: Vec<SyntheticResponse>,
    /// Call ids requested by more than one tool call, in order of reuse
    pub reused_call_ids: Vec<String>,
}

impl PatchReport {
    pub fn is_clean(&self) -> bool {
        self.synthesized.is_empty()
    }
}

/// Pair every dangling tool call with a cancellation response.
///
/// Returns `None` for an empty history: there is nothing to replace. Otherwise
/// returns the complete replacement history, which holds every input message
/// in its original order plus one synthetic response per unanswered call.
pub fn patch_dangling_tool_calls(messages: &[ChatMessage]) -> Option<Vec<ChatMessage>> {
    patch_dangling_tool_calls_with_report(messages).map(|(patched, _)| patched)
}

/// Same as [`patch_dangling_tool_calls`], also returning what was found.
pub fn patch_dangling_tool_calls_with_report(
    messages: &[ChatMessage],
) -> Option<(Vec<ChatMessage>, PatchReport)> {
    if messages.is_empty() {
        return None;
    }

    let mut report = PatchReport::default();
    let mut seen_call_ids: HashSet<&str> = HashSet::new();
    let mut patched = Vec::with_capacity(messages.len());

    for (i, msg) in messages.iter().enumerate() {
        patched.push(msg.clone());

        for call in msg.tool_calls() {
            report.inspected_calls += 1;

            // Matching stays a plain forward scan even when an id is reused.
            if !seen_call_ids.insert(call.id.as_str()) {
                warn!(
                    "Tool call id {} is reused at message {}; pairing may match a response meant for another call",
                    call.id, i
                );
                report.reused_call_ids.push(call.id.clone());
            }

            let answered = messages[i..].iter().any(|later| later.answers(&call.id));
            if answered {
                continue;
            }

            trace!(
                "Tool call {} ({}) at message {} has no response, inserting cancellation",
                call.id,
                call.name(),
                i
            );
            patched.push(ChatMessage::tool(ToolResponse::new(
                call.id.clone(),
                call.name(),
                cancellation_notice(call.name(), &call.id),
            )));
            report.synthesized.push(SyntheticResponse {
                after_index: i,
                call_id: call.id.clone(),
                tool_name: call.name().to_string(),
            });
        }
    }

    if !report.is_clean() {
        debug!(
            "Patched {} dangling tool call(s) out of {} in a history of {} message(s)",
            report.synthesized.len(),
            report.inspected_calls,
            messages.len()
        );
    }

    Some((patched, report))
}

/// Middleware that repairs dangling tool calls before a run reaches the model
pub struct PatchToolCallsMiddleware;

impl PatchToolCallsMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PatchToolCallsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MiddlewareDriver for PatchToolCallsMiddleware {
    async fn on_turn_start(&self, state: ExecutionState) -> Result<ExecutionState> {
        trace!(
            "PatchToolCallsMiddleware::on_turn_start entering state: {}",
            state.name()
        );

        match state {
            ExecutionState::BeforeTurn { ref context } => {
                let Some((patched, report)) =
                    patch_dangling_tool_calls_with_report(&context.messages)
                else {
                    return Ok(state);
                };

                let mut stats = (*context.stats).clone();
                stats.synthesized_tool_responses += report.synthesized.len();

                let context = context
                    .apply(HistoryUpdate::Overwrite(Arc::from(patched.into_boxed_slice())))
                    .with_stats(stats);

                Ok(ExecutionState::BeforeTurn {
                    context: Arc::new(context),
                })
            }
            terminal if terminal.is_terminal() => Ok(terminal),
            other => Err(MiddlewareError::InvalidState {
                expected: "BeforeTurn",
                actual: other.name(),
            }),
        }
    }

    fn reset(&self) {
        // No state to reset
    }

    fn name(&self) -> &'static str {
        "PatchToolCallsMiddleware"
    }
}

// ============================================================================
// Factory for config-based creation
// ============================================================================

/// Config for patch_tool_calls middleware from TOML
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatchToolCallsFactoryConfig {
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Factory for creating PatchToolCallsMiddleware from config
pub struct PatchToolCallsFactory;

impl MiddlewareFactory for PatchToolCallsFactory {
    fn type_name(&self) -> &'static str {
        "patch_tool_calls"
    }

    fn create(&self, config: &serde_json::Value) -> anyhow::Result<Arc<dyn MiddlewareDriver>> {
        let cfg: PatchToolCallsFactoryConfig = serde_json::from_value(config.clone())?;
        if !cfg.enabled {
            anyhow::bail!("patch_tool_calls middleware is disabled");
        }
        Ok(Arc::new(PatchToolCallsMiddleware::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::factory::MIDDLEWARE_REGISTRY;
    use crate::test_utils::{
        assistant_with_calls, other, test_context_with_messages, tool_response, user,
    };
    use callmend::chat::MessageKind;
    use callmend::wire::{ValidationMode, parse_history, to_wire_history};

    fn synthetic(call_id: &str, tool_name: &str) -> ChatMessage {
        tool_response(call_id, tool_name, &cancellation_notice(tool_name, call_id))
    }

    fn assert_paired(history: &[ChatMessage]) {
        for (i, msg) in history.iter().enumerate() {
            for call in msg.tool_calls() {
                let answers = history[i..]
                    .iter()
                    .filter(|later| later.answers(&call.id))
                    .count();
                assert_eq!(answers, 1, "call {} answered {} times", call.id, answers);
            }
        }
    }

    #[test]
    fn test_cancellation_notice_format() {
        assert_eq!(
            cancellation_notice("search", "call_1"),
            "Tool call search with id call_1 was cancelled - another message came in before it could be completed."
        );
    }

    #[test]
    fn test_empty_history_is_a_no_op() {
        assert!(patch_dangling_tool_calls(&[]).is_none());
        assert!(patch_dangling_tool_calls_with_report(&[]).is_none());
    }

    #[test]
    fn test_single_dangling_call_gets_cancelled() {
        let history = vec![assistant_with_calls(&[("1", "search")])];

        let (patched, report) = patch_dangling_tool_calls_with_report(&history).unwrap();

        assert_eq!(patched, vec![history[0].clone(), synthetic("1", "search")]);
        assert_eq!(
            report.synthesized,
            vec![SyntheticResponse {
                after_index: 0,
                call_id: "1".into(),
                tool_name: "search".into(),
            }]
        );
        let response = patched[1].tool_response().unwrap();
        assert_eq!(response.call_id, "1");
        assert_eq!(response.tool_name, "search");
        assert!(patched[1].id.is_none());
    }

    #[test]
    fn test_answered_call_passes_through() {
        let history = vec![
            assistant_with_calls(&[("1", "search")]),
            tool_response("1", "search", "results"),
        ];

        let (patched, report) = patch_dangling_tool_calls_with_report(&history).unwrap();

        assert_eq!(patched, history);
        assert!(report.is_clean());
        assert_eq!(report.inspected_calls, 1);
    }

    #[test]
    fn test_multiple_dangling_calls_inserted_in_listed_order() {
        let history = vec![
            assistant_with_calls(&[("1", "search"), ("2", "fetch")]),
            user("never mind"),
        ];

        let patched = patch_dangling_tool_calls(&history).unwrap();

        assert_eq!(
            patched,
            vec![
                history[0].clone(),
                synthetic("1", "search"),
                synthetic("2", "fetch"),
                history[1].clone(),
            ]
        );
    }

    #[test]
    fn test_interleaved_responses_still_count_as_answered() {
        let history = vec![
            assistant_with_calls(&[("1", "search")]),
            assistant_with_calls(&[("2", "fetch")]),
            tool_response("2", "fetch", "page"),
            tool_response("1", "search", "results"),
        ];

        let (patched, report) = patch_dangling_tool_calls_with_report(&history).unwrap();

        assert_eq!(patched, history);
        assert!(report.is_clean());
    }

    #[test]
    fn test_partial_pairing_only_patches_the_missing_call() {
        let history = vec![
            user("look two things up"),
            assistant_with_calls(&[("a", "search"), ("b", "search")]),
            tool_response("a", "search", "first"),
            user("stop, new question"),
        ];

        let patched = patch_dangling_tool_calls(&history).unwrap();

        assert_eq!(
            patched,
            vec![
                history[0].clone(),
                history[1].clone(),
                synthetic("b", "search"),
                history[2].clone(),
                history[3].clone(),
            ]
        );
        assert_paired(&patched);
    }

    #[test]
    fn test_response_far_after_the_call_counts() {
        let history = vec![
            assistant_with_calls(&[("1", "search")]),
            user("still there?"),
            other("system", "note"),
            assistant_with_calls(&[]),
            tool_response("1", "search", "late"),
        ];

        let patched = patch_dangling_tool_calls(&history).unwrap();
        assert_eq!(patched, history);
    }

    #[test]
    fn test_response_before_the_call_does_not_count() {
        let history = vec![
            tool_response("1", "search", "stale"),
            assistant_with_calls(&[("1", "search")]),
        ];

        let patched = patch_dangling_tool_calls(&history).unwrap();

        assert_eq!(patched.len(), 3);
        assert_eq!(patched[2], synthetic("1", "search"));
    }

    #[test]
    fn test_orphaned_responses_and_opaque_entries_pass_through() {
        let history = vec![
            user("hi"),
            tool_response("ghost", "search", "nobody asked"),
            ChatMessage::opaque(serde_json::json!({"role": "assistant", "tool_calls": "bad"})),
        ];

        let (patched, report) = patch_dangling_tool_calls_with_report(&history).unwrap();

        assert_eq!(patched, history);
        assert_eq!(report.inspected_calls, 0);
    }

    #[test]
    fn test_history_without_tool_calls_is_unchanged() {
        let history = vec![user("hi"), other("system", "be brief"), user("again")];
        assert_eq!(patch_dangling_tool_calls(&history).unwrap(), history);
    }

    #[test]
    fn test_nameless_call_still_gets_a_response() {
        let history = vec![assistant_with_calls(&[("call_7", "")])];

        let patched = patch_dangling_tool_calls(&history).unwrap();

        let response = patched[1].tool_response().unwrap();
        assert_eq!(response.call_id, "call_7");
        assert_eq!(response.tool_name, "");
        assert!(response.content.contains("with id call_7"));
    }

    #[test]
    fn test_reused_call_id_is_reported_but_matched_forward() {
        // The second request reuses id "1"; the single response after it
        // satisfies both, so nothing is inserted.
        let history = vec![
            assistant_with_calls(&[("1", "search")]),
            user("again"),
            assistant_with_calls(&[("1", "search")]),
            tool_response("1", "search", "results"),
        ];

        let (patched, report) = patch_dangling_tool_calls_with_report(&history).unwrap();

        assert_eq!(patched, history);
        assert_eq!(report.reused_call_ids, vec!["1".to_string()]);
    }

    #[test]
    fn test_reused_call_id_answered_only_before_the_reuse() {
        let history = vec![
            assistant_with_calls(&[("1", "search")]),
            tool_response("1", "search", "results"),
            assistant_with_calls(&[("1", "search")]),
        ];

        let patched = patch_dangling_tool_calls(&history).unwrap();

        assert_eq!(patched.len(), 4);
        assert_eq!(patched[3], synthetic("1", "search"));
    }

    #[test]
    fn test_repair_is_idempotent_and_preserves_order() {
        let history = vec![
            other("system", "be brief"),
            user("go"),
            assistant_with_calls(&[("1", "search"), ("2", "fetch")]),
            tool_response("2", "fetch", "page"),
            assistant_with_calls(&[("3", "shell")]),
            user("interrupt"),
            tool_response("orphan", "x", "y"),
        ];

        let once = patch_dangling_tool_calls(&history).unwrap();
        let twice = patch_dangling_tool_calls(&once).unwrap();

        assert_eq!(once, twice);
        assert_paired(&once);

        // Originals keep their relative order once the synthetic ones are removed.
        let originals: Vec<_> = once
            .iter()
            .filter(|msg| {
                !matches!(&msg.kind, MessageKind::Tool(r) if r.content == cancellation_notice(&r.tool_name, &r.call_id))
            })
            .cloned()
            .collect();
        assert_eq!(originals, history);
    }

    #[test]
    fn test_lenient_wire_history_is_repaired_end_to_end() {
        let raw = serde_json::json!([
            {"role": "assistant", "content": "", "tool_calls": [
                {"id": "a", "type": "function", "function": {"name": "search", "arguments": "{}"}},
                {"function": {"name": "broken"}}
            ]},
            {"role": "user", "content": [
                {"type": "text", "text": "stop"},
                {"type": "image_url", "image_url": {"url": "https://example.com/cat.png"}}
            ]}
        ]);

        let history = parse_history(&raw, ValidationMode::Lenient).unwrap();
        let patched = patch_dangling_tool_calls(&history).unwrap();
        let wire = to_wire_history(&patched);

        assert_eq!(
            wire,
            serde_json::json!([
                raw[0].clone(),
                {
                    "role": "tool",
                    "tool_call_id": "a",
                    "name": "search",
                    "content": cancellation_notice("search", "a")
                },
                raw[1].clone()
            ])
        );
    }

    #[tokio::test]
    async fn test_middleware_overwrites_history() {
        let history = vec![
            assistant_with_calls(&[("1", "search")]),
            user("actually, stop"),
        ];
        let context = test_context_with_messages("sess-1", history.clone());
        let middleware = PatchToolCallsMiddleware::new();

        let result = middleware
            .on_turn_start(ExecutionState::BeforeTurn { context })
            .await
            .unwrap();

        let ExecutionState::BeforeTurn { context } = result else {
            panic!("Expected BeforeTurn state");
        };
        assert_eq!(
            context.messages.to_vec(),
            vec![history[0].clone(), synthetic("1", "search"), history[1].clone()]
        );
        assert_eq!(context.stats.synthesized_tool_responses, 1);
    }

    #[tokio::test]
    async fn test_middleware_leaves_empty_history_untouched() {
        let context = test_context_with_messages("sess-1", vec![]);
        let middleware = PatchToolCallsMiddleware::new();

        let result = middleware
            .on_turn_start(ExecutionState::BeforeTurn {
                context: context.clone(),
            })
            .await
            .unwrap();

        let ExecutionState::BeforeTurn { context: after } = result else {
            panic!("Expected BeforeTurn state");
        };
        assert!(Arc::ptr_eq(&after, &context));
    }

    #[tokio::test]
    async fn test_middleware_rejects_states_past_turn_start() {
        let middleware = PatchToolCallsMiddleware::new();
        let context =
            test_context_with_messages("sess-1", vec![assistant_with_calls(&[("1", "search")])]);

        let err = middleware
            .on_turn_start(ExecutionState::CallLlm { context })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MiddlewareError::InvalidState {
                expected: "BeforeTurn",
                actual: "CallLlm",
            }
        ));
    }

    #[tokio::test]
    async fn test_middleware_passes_terminal_states_through() {
        let middleware = PatchToolCallsMiddleware::new();

        let result = middleware
            .on_turn_start(ExecutionState::Cancelled)
            .await
            .unwrap();

        assert!(matches!(result, ExecutionState::Cancelled));
    }

    #[test]
    fn test_patch_tool_calls_factory_registered() {
        let types = MIDDLEWARE_REGISTRY.type_names();
        assert!(types.contains(&"patch_tool_calls"));
    }

    #[test]
    fn test_patch_tool_calls_factory_config() {
        let factory = PatchToolCallsFactory;
        assert!(factory.create(&serde_json::json!({})).is_ok());
        assert!(factory.create(&serde_json::json!({"enabled": true})).is_ok());
        assert!(factory.create(&serde_json::json!({"enabled": false})).is_err());
        assert!(factory.create(&serde_json::json!({"template": "x"})).is_err());
    }
}
