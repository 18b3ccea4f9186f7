use crate::middleware::{MiddlewareDriver, PatchToolCallsMiddleware};
use std::sync::Arc;

pub struct MiddlewarePresets;

impl MiddlewarePresets {
    /// History repair only, which every run needs before reaching the model
    pub fn defaults() -> Vec<Arc<dyn MiddlewareDriver>> {
        vec![Arc::new(PatchToolCallsMiddleware::new())]
    }

    /// No middleware at all; histories reach the model as stored
    pub fn none() -> Vec<Arc<dyn MiddlewareDriver>> {
        Vec::new()
    }
}
