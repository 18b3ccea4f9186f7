//! Test utilities for agent testing
//!
//! This module provides shared mocks, helpers, and test infrastructure
//! to reduce code duplication across test files.

pub mod drivers;
pub mod helpers;
pub mod mocks;

// Re-export commonly used items
pub use drivers::*;
pub use helpers::*;
pub use mocks::*;
