//! Commonly-used types for agent applications
//!
//! ```no_run
//! use callmend_agent::prelude::*;
//!
//! # async fn run(model: std::sync::Arc<dyn ModelStep>) -> anyhow::Result<()> {
//! let config = parse_config(
//!     "[agent]\nprovider = \"openai\"\nmodel = \"gpt-4o-mini\"\n\n[[middleware]]\ntype = \"patch_tool_calls\"\n",
//! )?;
//! let runner = TurnRunner::new(build_middleware(&config.middleware)?, model);
//! # let _ = runner;
//! # Ok(())
//! # }
//! ```

// Chat model
pub use callmend::chat::{ChatMessage, ChatRole, MessageKind, ToolResponse};
pub use callmend::wire::{ValidationMode, parse_history, to_wire_history};
pub use callmend::{ChatError, ToolCall};

// Config and runner APIs
pub use crate::config::{
    AgentConfig, AgentSettings, MiddlewareEntry, build_middleware, load_config, parse_config,
};
pub use crate::runner::{ModelStep, StopReason, TurnOutcome, TurnRunner};

// Middleware
pub use crate::middleware::{
    AgentStats, CompositeDriver, ConversationContext, ExecutionState, HistoryUpdate,
    MiddlewareDriver, MiddlewarePresets, PatchToolCallsMiddleware, patch_dangling_tool_calls,
};

pub use crate::error::AgentError;
pub use crate::transcript::MessageTracker;
