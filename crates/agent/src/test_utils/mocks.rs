//! Mock implementations for testing

use crate::runner::ModelStep;
use async_trait::async_trait;
use callmend::chat::ChatMessage;
use mockall::mock;

// ============================================================================
// MockModelStep
// ============================================================================

mock! {
    pub ModelStep {}

    #[async_trait]
    impl ModelStep for ModelStep {
        async fn step(&self, messages: &[ChatMessage]) -> anyhow::Result<ChatMessage>;
    }
}
