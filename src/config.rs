//! Engine configuration
//!
//! Settings are layered: built-in defaults, an optional `cadence.toml`
//! (or an explicit file), then `CADENCE_*` environment variables. A `.env`
//! file is read first so it can feed the environment layer.

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Runtime limits and rewriting parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Statements a single resumption may execute before it is aborted
    pub max_steps: u64,
    /// Nested call depth (user functions and inner generators)
    pub max_call_depth: usize,
    /// Spaces per indentation level in normalized programs
    pub indent_width: usize,
    /// Emit every synthesized state block at `trace` level
    pub trace_state_blocks: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            max_call_depth: 64,
            indent_width: 4,
            trace_state_blocks: false,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Load from the default sources
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::Message("max_steps must be positive".into()));
        }
        if self.indent_width == 0 {
            return Err(ConfigError::Message("indent_width must be positive".into()));
        }
        Ok(self)
    }
}

/// Explicit overrides applied on top of every other source
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config_path: Option<PathBuf>,
    max_steps: Option<u64>,
    max_call_depth: Option<usize>,
    indent_width: Option<usize>,
    trace_state_blocks: Option<bool>,
}

impl EngineConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn max_steps(mut self, steps: Option<u64>) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn max_call_depth(mut self, depth: Option<usize>) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn indent_width(mut self, width: Option<usize>) -> Self {
        self.indent_width = width;
        self
    }

    pub fn trace_state_blocks(mut self, trace: Option<bool>) -> Self {
        self.trace_state_blocks = trace;
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = EngineConfig::default();
        let mut builder = Config::builder()
            .set_default("max_steps", defaults.max_steps as i64)?
            .set_default("max_call_depth", defaults.max_call_depth as i64)?
            .set_default("indent_width", defaults.indent_width as i64)?
            .set_default("trace_state_blocks", defaults.trace_state_blocks)?;

        builder = match &self.config_path {
            Some(path) => builder.add_source(File::from(path.as_path()).required(true)),
            None => builder.add_source(File::with_name("cadence").required(false)),
        };
        builder = builder.add_source(Environment::with_prefix("CADENCE").try_parsing(true));

        if let Some(steps) = self.max_steps {
            builder = builder.set_override("max_steps", steps as i64)?;
        }
        if let Some(depth) = self.max_call_depth {
            builder = builder.set_override("max_call_depth", depth as i64)?;
        }
        if let Some(width) = self.indent_width {
            builder = builder.set_override("indent_width", width as i64)?;
        }
        if let Some(trace) = self.trace_state_blocks {
            builder = builder.set_override("trace_state_blocks", trace)?;
        }

        builder.build()?.try_deserialize::<EngineConfig>()?.validate()
    }
}

/// The configuration installed by [`crate::init`], or the defaults
pub fn current() -> EngineConfig {
    crate::init::config().cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_win() {
        let config = EngineConfig::builder()
            .max_steps(Some(50))
            .indent_width(Some(2))
            .build()
            .unwrap();

        assert_eq!(config.max_steps, 50);
        assert_eq!(config.indent_width, 2);
        assert_eq!(config.max_call_depth, EngineConfig::default().max_call_depth);
    }

    #[test]
    fn test_zero_step_budget_rejected() {
        let result = EngineConfig::builder().max_steps(Some(0)).build();
        assert!(result.is_err());
    }
}
