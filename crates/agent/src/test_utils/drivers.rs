//! Common test driver implementations for middleware testing

use crate::middleware::{ExecutionState, MiddlewareDriver, MiddlewareError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// StateRecordingDriver - Records the phase and name of states it sees
// ============================================================================

pub struct StateRecordingDriver {
    seen_states: Arc<Mutex<Vec<String>>>,
}

impl StateRecordingDriver {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let states = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                seen_states: states.clone(),
            },
            states,
        )
    }

    fn record(&self, phase: &str, state: &ExecutionState) {
        self.seen_states
            .lock()
            .unwrap()
            .push(format!("{}:{}", phase, state.name()));
    }
}

#[async_trait]
impl MiddlewareDriver for StateRecordingDriver {
    async fn on_turn_start(&self, state: ExecutionState) -> Result<ExecutionState> {
        self.record("turn_start", &state);
        Ok(state)
    }

    async fn on_step_start(&self, state: ExecutionState) -> Result<ExecutionState> {
        self.record("step_start", &state);
        Ok(state)
    }

    async fn on_after_llm(&self, state: ExecutionState) -> Result<ExecutionState> {
        self.record("after_llm", &state);
        Ok(state)
    }

    fn reset(&self) {
        self.seen_states.lock().unwrap().clear();
    }

    fn name(&self) -> &'static str {
        "StateRecordingDriver"
    }
}

// ============================================================================
// MessageInjectingDriver - Appends a user message at turn start
// ============================================================================

pub struct MessageInjectingDriver {
    pub inject_content: String,
}

#[async_trait]
impl MiddlewareDriver for MessageInjectingDriver {
    async fn on_turn_start(&self, state: ExecutionState) -> Result<ExecutionState> {
        match state {
            ExecutionState::BeforeTurn { context } => Ok(ExecutionState::BeforeTurn {
                context: Arc::new(context.inject_message(self.inject_content.clone())),
            }),
            other => Ok(other),
        }
    }

    fn reset(&self) {}

    fn name(&self) -> &'static str {
        "MessageInjectingDriver"
    }
}

// ============================================================================
// PassThroughDriver - Simply passes state through unchanged
// ============================================================================

pub struct PassThroughDriver;

#[async_trait]
impl MiddlewareDriver for PassThroughDriver {
    fn reset(&self) {}

    fn name(&self) -> &'static str {
        "PassThrough"
    }
}

// ============================================================================
// StopDriver - Returns Stopped state at turn start
// ============================================================================

pub struct StopDriver {
    pub message: &'static str,
}

#[async_trait]
impl MiddlewareDriver for StopDriver {
    async fn on_turn_start(&self, _state: ExecutionState) -> Result<ExecutionState> {
        Ok(ExecutionState::Stopped {
            message: self.message.into(),
        })
    }

    fn reset(&self) {}

    fn name(&self) -> &'static str {
        "StopDriver"
    }
}

// ============================================================================
// CancelDriver - Returns Cancelled state at turn start
// ============================================================================

pub struct CancelDriver;

#[async_trait]
impl MiddlewareDriver for CancelDriver {
    async fn on_turn_start(&self, _state: ExecutionState) -> Result<ExecutionState> {
        Ok(ExecutionState::Cancelled)
    }

    fn reset(&self) {}

    fn name(&self) -> &'static str {
        "CancelDriver"
    }
}

// ============================================================================
// CountingDriver - Counts how many times turn start runs
// ============================================================================

pub struct CountingDriver {
    pub count: AtomicUsize,
}

impl CountingDriver {
    pub fn new() -> Self {
        Self::with_initial(0)
    }

    pub fn with_initial(initial: usize) -> Self {
        Self {
            count: AtomicUsize::new(initial),
        }
    }
}

impl Default for CountingDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MiddlewareDriver for CountingDriver {
    async fn on_turn_start(&self, state: ExecutionState) -> Result<ExecutionState> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(state)
    }

    fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "CountingDriver"
    }
}

// ============================================================================
// ErrorDriver - Always returns an error at turn start
// ============================================================================

pub struct ErrorDriver;

#[async_trait]
impl MiddlewareDriver for ErrorDriver {
    async fn on_turn_start(&self, state: ExecutionState) -> Result<ExecutionState> {
        Err(MiddlewareError::InvalidState {
            expected: "anything else",
            actual: state.name(),
        })
    }

    fn reset(&self) {}

    fn name(&self) -> &'static str {
        "ErrorDriver"
    }
}
