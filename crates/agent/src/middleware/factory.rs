//! Middleware factory registry for config-based middleware creation
//!
//! Each middleware type registers a factory that knows how to create instances
//! from a raw JSON/TOML config value.
//!
//! # Example
//!
//! ```toml
//! [[middleware]]
//! type = "patch_tool_calls"
//! enabled = true
//! ```
//!
//! The registry will look up the "patch_tool_calls" factory and pass the config to it.

use crate::middleware::MiddlewareDriver;
use anyhow::Result;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating middleware from config
pub trait MiddlewareFactory: Send + Sync {
    /// Type name used in config files (e.g., "patch_tool_calls")
    fn type_name(&self) -> &'static str;

    /// Create middleware instance from raw JSON config
    ///
    /// The config value contains all fields from the TOML section except "type".
    /// Returns an error if the middleware is disabled or config is invalid.
    fn create(&self, config: &Value) -> Result<Arc<dyn MiddlewareDriver>>;
}

/// Global middleware registry (lazy singleton)
///
/// ```ignore
/// use callmend_agent::middleware::MIDDLEWARE_REGISTRY;
///
/// let middleware = MIDDLEWARE_REGISTRY.create("patch_tool_calls", &config)?;
/// ```
pub static MIDDLEWARE_REGISTRY: Lazy<MiddlewareRegistry> = Lazy::new(MiddlewareRegistry::new);

/// Registry of available middleware factories
pub struct MiddlewareRegistry {
    factories: HashMap<&'static str, Arc<dyn MiddlewareFactory>>,
}

impl MiddlewareRegistry {
    fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        // Register built-in factories
        registry.register(Arc::new(super::patch_tool_calls::PatchToolCallsFactory));
        registry
    }

    fn register(&mut self, factory: Arc<dyn MiddlewareFactory>) {
        self.factories.insert(factory.type_name(), factory);
    }

    /// Get a factory by type name
    pub fn get(&self, type_name: &str) -> Option<&Arc<dyn MiddlewareFactory>> {
        self.factories.get(type_name)
    }

    /// Create middleware from type name and config
    ///
    /// Returns an error if:
    /// - The middleware type is unknown
    /// - The middleware is disabled (config has `enabled = false`)
    /// - The config is invalid for this middleware type
    pub fn create(&self, type_name: &str, config: &Value) -> Result<Arc<dyn MiddlewareDriver>> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown middleware type: {}", type_name))?;
        factory.create(config)
    }

    /// List all registered middleware type names
    pub fn type_names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}
