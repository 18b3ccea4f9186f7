//! Single-turn runner tying the middleware pipeline to a model step
//!
//! The history produced by the turn-start phase is authoritative: it is
//! what the model sees and what the returned context carries.

use crate::config::{AgentConfig, build_middleware, load_config};
use crate::error::AgentError;
use crate::middleware::{
    AgentStats, CompositeDriver, ConversationContext, ExecutionState, HistoryUpdate,
    MIDDLEWARE_REGISTRY,
};
use async_trait::async_trait;
use callmend::chat::ChatMessage;
use log::debug;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// One call to the model with the current history
#[async_trait]
pub trait ModelStep: Send + Sync {
    async fn step(&self, messages: &[ChatMessage]) -> anyhow::Result<ChatMessage>;
}

/// Why a turn ended without a model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A middleware stopped execution with this message
    Middleware(String),
    /// Execution was cancelled
    Cancelled,
    /// A middleware marked the turn complete
    Completed,
}

/// Result of running one turn
#[derive(Debug)]
pub struct TurnOutcome {
    pub context: Arc<ConversationContext>,
    pub reply: Option<ChatMessage>,
    pub stop: Option<StopReason>,
}

pub struct TurnRunner {
    driver: CompositeDriver,
    model: Arc<dyn ModelStep>,
}

impl TurnRunner {
    pub fn new(driver: CompositeDriver, model: Arc<dyn ModelStep>) -> Self {
        Self { driver, model }
    }

    /// Build a runner whose pipeline is the config's middleware list
    pub fn from_config(
        config: &AgentConfig,
        model: Arc<dyn ModelStep>,
    ) -> Result<Self, AgentError> {
        if let Some(entry) = config.middleware.iter().find(|entry| {
            entry.is_enabled() && MIDDLEWARE_REGISTRY.get(&entry.middleware_type).is_none()
        }) {
            return Err(AgentError::UnknownMiddleware {
                name: entry.middleware_type.clone(),
            });
        }

        let driver = build_middleware(&config.middleware)
            .map_err(|e| AgentError::Config(format!("{:#}", e)))?;
        debug!(
            "Built runner for {}/{} with middleware {:?}",
            config.agent.provider,
            config.agent.model,
            driver.names()
        );
        Ok(Self::new(driver, model))
    }

    /// Load a TOML config file and build a runner from it
    pub async fn from_config_file(
        path: impl AsRef<Path>,
        model: Arc<dyn ModelStep>,
    ) -> Result<Self, AgentError> {
        let config = load_config(path)
            .await
            .map_err(|e| AgentError::Config(format!("{:#}", e)))?;
        Self::from_config(&config, model)
    }

    pub fn driver(&self) -> &CompositeDriver {
        &self.driver
    }

    #[instrument(
        name = "turn.run",
        skip(self, context),
        fields(session_id = %context.session_id, messages = context.messages.len())
    )]
    pub async fn run(&self, context: Arc<ConversationContext>) -> Result<TurnOutcome, AgentError> {
        self.driver.reset();

        let mut stats = (*context.stats).clone();
        stats.turns += 1;
        let context = Arc::new(context.with_stats(stats));

        let state = self
            .driver
            .run_turn_start(ExecutionState::BeforeTurn {
                context: context.clone(),
            })
            .await?;
        let context = match state {
            ExecutionState::BeforeTurn { context } | ExecutionState::CallLlm { context } => context,
            other => return Self::finish_without_reply(other, context),
        };

        let state = self
            .driver
            .run_step_start(ExecutionState::CallLlm {
                context: context.clone(),
            })
            .await?;
        let context = match state {
            ExecutionState::CallLlm { context } => context,
            other => return Self::finish_without_reply(other, context),
        };

        debug!(
            "Calling model {}/{} with {} messages",
            context.provider,
            context.model,
            context.messages.len()
        );
        let reply = self
            .model
            .step(&context.messages)
            .await
            .map_err(|e| AgentError::ModelStep(format!("{:#}", e)))?;

        let state = self
            .driver
            .run_after_llm(ExecutionState::AfterLlm {
                reply: Arc::new(reply),
                context: context.clone(),
            })
            .await?;
        let (reply, context) = match state {
            ExecutionState::AfterLlm { reply, context } => (reply, context),
            other => return Self::finish_without_reply(other, context),
        };

        let reply = Arc::unwrap_or_clone(reply);
        let stats = AgentStats {
            steps: context.stats.steps + 1,
            ..(*context.stats).clone()
        };
        let context = context
            .apply(HistoryUpdate::Append(vec![reply.clone()]))
            .with_stats(stats);

        Ok(TurnOutcome {
            context: Arc::new(context),
            reply: Some(reply),
            stop: None,
        })
    }

    /// `context` is the last history the pipeline accepted before ending
    fn finish_without_reply(
        state: ExecutionState,
        context: Arc<ConversationContext>,
    ) -> Result<TurnOutcome, AgentError> {
        let stop = match state {
            ExecutionState::Stopped { message } => StopReason::Middleware(message.to_string()),
            ExecutionState::Cancelled => StopReason::Cancelled,
            ExecutionState::Complete => StopReason::Completed,
            other => {
                return Err(AgentError::Middleware(format!(
                    "unexpected state after middleware: {}",
                    other.name()
                )));
            }
        };
        debug!("Turn ended early: {:?}", stop);
        Ok(TurnOutcome {
            context,
            reply: None,
            stop: Some(stop),
        })
    }
}
