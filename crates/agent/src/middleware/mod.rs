pub mod driver;
pub mod error;
pub mod factory;
pub mod patch_tool_calls;
pub mod state;

mod presets;

pub use driver::{CompositeDriver, MiddlewareDriver};
pub use error::{MiddlewareError, Result};
pub use factory::{MIDDLEWARE_REGISTRY, MiddlewareFactory, MiddlewareRegistry};
pub use patch_tool_calls::{
    PatchReport, PatchToolCallsFactory, PatchToolCallsMiddleware, SyntheticResponse,
    cancellation_notice, patch_dangling_tool_calls, patch_dangling_tool_calls_with_report,
};
pub use presets::MiddlewarePresets;
pub use state::{AgentStats, ConversationContext, ExecutionState, HistoryUpdate};
