//! Configuration file support for agents
//!
//! An agent config names the model to talk to and the middleware pipeline
//! that runs before it sees a history.
//!
//! ```toml
//! [agent]
//! provider = "openai"
//! model = "${MODEL:-gpt-4o-mini}"
//!
//! [[middleware]]
//! type = "patch_tool_calls"
//! ```

use crate::middleware::{CompositeDriver, MIDDLEWARE_REGISTRY, MiddlewareDriver};
use anyhow::{Context, Result, anyhow};
use log::debug;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Single agent configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub agent: AgentSettings,
    #[serde(default)]
    pub middleware: Vec<MiddlewareEntry>,
}

/// Raw middleware entry from TOML config
///
/// The `type` field determines which middleware factory to use.
/// All other fields are passed to the factory as a JSON value.
///
/// # Example
///
/// ```toml
/// [[middleware]]
/// type = "patch_tool_calls"
/// enabled = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MiddlewareEntry {
    /// The middleware type name (e.g., "patch_tool_calls")
    #[serde(rename = "type")]
    pub middleware_type: String,
    /// All other config fields, passed to the middleware factory
    #[serde(flatten)]
    pub config: serde_json::Value,
}

impl MiddlewareEntry {
    /// Entries are enabled unless they say `enabled = false`
    pub fn is_enabled(&self) -> bool {
        self.config
            .get("enabled")
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }
}

/// Agent settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSettings {
    pub provider: String,
    pub model: String,
    pub system: Option<String>,
}

/// Load and parse a config file
pub async fn load_config(path: impl AsRef<Path>) -> Result<AgentConfig> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Invalid config file: {:?}", path))
}

/// Parse config content after interpolating environment variables
pub fn parse_config(content: &str) -> Result<AgentConfig> {
    let processed = interpolate_env_vars(content)?;

    if !processed.contains("[agent]") {
        return Err(anyhow!("Invalid config: must contain an [agent] section"));
    }

    let config: AgentConfig =
        toml::from_str(&processed).with_context(|| "Failed to parse agent config")?;
    validate_agent_settings(&config.agent)?;

    Ok(config)
}

/// Interpolate environment variables in config content
/// Supports ${VAR} and ${VAR:-default} syntax
pub fn interpolate_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .context("Failed to compile env var regex")?;

    let mut errors = Vec::new();

    let result = re.replace_all(content, |caps: &Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str());

        match (std::env::var(var_name), default) {
            (Ok(val), _) => val,
            (Err(_), Some(default)) => default.to_string(),
            (Err(_), None) => {
                errors.push(var_name.to_string());
                String::new()
            }
        }
    });

    if !errors.is_empty() {
        return Err(anyhow!(
            "Required environment variables not set: {}",
            errors.join(", ")
        ));
    }

    Ok(result.into_owned())
}

/// Build the middleware pipeline described by `entries`, in order
pub fn build_middleware(entries: &[MiddlewareEntry]) -> Result<CompositeDriver> {
    let mut drivers: Vec<Arc<dyn MiddlewareDriver>> = Vec::with_capacity(entries.len());

    for entry in entries {
        if !entry.is_enabled() {
            debug!("Skipping disabled middleware: {}", entry.middleware_type);
            continue;
        }
        let driver = MIDDLEWARE_REGISTRY
            .create(&entry.middleware_type, &entry.config)
            .with_context(|| format!("Failed to create middleware '{}'", entry.middleware_type))?;
        drivers.push(driver);
    }

    Ok(CompositeDriver::new(drivers))
}

fn validate_agent_settings(settings: &AgentSettings) -> Result<()> {
    if settings.provider.trim().is_empty() {
        return Err(anyhow!("'provider' must not be empty in agent config"));
    }
    if settings.model.trim().is_empty() {
        return Err(anyhow!("'model' must not be empty in agent config"));
    }
    Ok(())
}
