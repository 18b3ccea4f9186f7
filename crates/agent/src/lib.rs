pub mod error;
pub mod prelude;

pub mod config;
pub mod runner;

pub mod middleware;
pub mod transcript;

#[cfg(test)]
pub mod test_utils;

// Re-export top-level error type
pub use error::AgentError;

pub use runner::{ModelStep, StopReason, TurnOutcome, TurnRunner};
