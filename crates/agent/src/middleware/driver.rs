use crate::middleware::{ExecutionState, Result};
use async_trait::async_trait;
use log::{debug, trace};
use std::sync::Arc;
use tracing::{Instrument, info_span, instrument};

/// Trait for middleware that runs at specific lifecycle phases
#[async_trait]
pub trait MiddlewareDriver: Send + Sync {
    /// Runs once at the start of a run, before the first model call
    async fn on_turn_start(&self, state: ExecutionState) -> Result<ExecutionState> {
        Ok(state)
    }

    /// Runs before each model call
    async fn on_step_start(&self, state: ExecutionState) -> Result<ExecutionState> {
        Ok(state)
    }

    /// Runs after receiving the model reply
    async fn on_after_llm(&self, state: ExecutionState) -> Result<ExecutionState> {
        Ok(state)
    }

    /// Reset internal state (called at the start of every run)
    fn reset(&self);

    /// Returns a human-readable name for this driver
    fn name(&self) -> &'static str;
}

/// Composite driver that runs multiple middleware drivers in sequence
pub struct CompositeDriver {
    drivers: Vec<Arc<dyn MiddlewareDriver>>,
}

impl CompositeDriver {
    pub fn new(drivers: Vec<Arc<dyn MiddlewareDriver>>) -> Self {
        debug!("Creating CompositeDriver with {} middleware", drivers.len());
        Self { drivers }
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Names of the drivers, in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.drivers.iter().map(|driver| driver.name()).collect()
    }

    pub async fn run_turn_start(&self, state: ExecutionState) -> Result<ExecutionState> {
        self.run_phase(state, MiddlewarePhase::TurnStart).await
    }

    pub async fn run_step_start(&self, state: ExecutionState) -> Result<ExecutionState> {
        self.run_phase(state, MiddlewarePhase::StepStart).await
    }

    pub async fn run_after_llm(&self, state: ExecutionState) -> Result<ExecutionState> {
        self.run_phase(state, MiddlewarePhase::AfterLlm).await
    }

    pub fn reset(&self) {
        debug!(
            "Resetting CompositeDriver with {} middleware",
            self.drivers.len()
        );
        for driver in &self.drivers {
            trace!("Resetting driver: {}", driver.name());
            driver.reset();
        }
    }

    pub fn name(&self) -> &'static str {
        "CompositeDriver"
    }

    #[instrument(
        name = "middleware.phase",
        skip(self, state),
        fields(
            phase = %phase.name(),
            input_state = %state.name(),
            output_state = tracing::field::Empty,
            drivers_count = %self.drivers.len()
        )
    )]
    async fn run_phase(
        &self,
        state: ExecutionState,
        phase: MiddlewarePhase,
    ) -> Result<ExecutionState> {
        trace!(
            "CompositeDriver::run_phase entering {} with state: {}",
            phase.name(),
            state.name()
        );

        let mut current = state;

        for (idx, driver) in self.drivers.iter().enumerate() {
            let driver_name = driver.name();
            let current_state_name = current.name();

            trace!(
                "  Running driver {}/{}: {} on phase {} with state: {}",
                idx + 1,
                self.drivers.len(),
                driver_name,
                phase.name(),
                current_state_name
            );

            let span = info_span!("middleware.driver", name = %driver_name, phase = %phase.name());
            current = match phase {
                MiddlewarePhase::TurnStart => driver.on_turn_start(current).instrument(span).await?,
                MiddlewarePhase::StepStart => driver.on_step_start(current).instrument(span).await?,
                MiddlewarePhase::AfterLlm => driver.on_after_llm(current).instrument(span).await?,
            };

            trace!(
                "  Driver {} transitioned: {} -> {}",
                driver_name,
                current_state_name,
                current.name()
            );

            if current.is_terminal() {
                debug!(
                    "CompositeDriver: {} produced terminal state {}, stopping pipeline",
                    driver_name,
                    current.name()
                );
                break;
            }
        }

        let final_state_name = current.name();
        trace!(
            "CompositeDriver::run_phase exiting {} with state: {}",
            phase.name(),
            final_state_name
        );

        tracing::Span::current().record("output_state", final_state_name);

        Ok(current)
    }
}

#[derive(Clone, Copy, Debug)]
enum MiddlewarePhase {
    TurnStart,
    StepStart,
    AfterLlm,
}

impl MiddlewarePhase {
    fn name(&self) -> &'static str {
        match self {
            MiddlewarePhase::TurnStart => "turn_start",
            MiddlewarePhase::StepStart => "step_start",
            MiddlewarePhase::AfterLlm => "after_llm",
        }
    }
}
