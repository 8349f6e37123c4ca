//! Initialization system for Cadence
//!
//! Hosts may call this once at startup to pin the engine configuration and
//! optionally install a tracing subscriber. Without it every generator runs
//! with [`EngineConfig::default`].
//!
//! # Example
//!
//! ```rust
//! use cadence_core::init::InitBuilder;
//!
//! InitBuilder::new()
//!     .max_steps(10_000)
//!     .install_tracing(true)
//!     .init()
//!     .unwrap();
//! ```

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;

/// Global initialization state
static INIT_STATE: OnceLock<InitState> = OnceLock::new();

#[derive(Debug)]
struct InitState {
    config: EngineConfig,
}

/// Options for initializing Cadence
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Config file path (overrides the `cadence.toml` search)
    pub config_path: Option<String>,

    /// Per-resumption statement budget
    pub max_steps: Option<u64>,

    /// Nested call limit
    pub max_call_depth: Option<usize>,

    /// Log every synthesized state block
    pub trace_state_blocks: Option<bool>,

    /// Install a `tracing-subscriber` fmt layer writing to stderr
    pub install_tracing: bool,
}

/// Builder for constructing InitOptions
pub struct InitBuilder {
    options: InitOptions,
}

impl InitBuilder {
    pub fn new() -> Self {
        Self {
            options: InitOptions::default(),
        }
    }

    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn max_steps(mut self, steps: u64) -> Self {
        self.options.max_steps = Some(steps);
        self
    }

    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.options.max_call_depth = Some(depth);
        self
    }

    pub fn trace_state_blocks(mut self, trace: bool) -> Self {
        self.options.trace_state_blocks = Some(trace);
        self
    }

    pub fn install_tracing(mut self, install: bool) -> Self {
        self.options.install_tracing = install;
        self
    }

    pub fn init(self) -> Result<()> {
        initialize(self.options)
    }
}

impl Default for InitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize Cadence with the given options
///
/// Calling this function multiple times is safe - subsequent calls are no-ops.
pub fn initialize(options: InitOptions) -> Result<()> {
    if INIT_STATE.get().is_some() {
        return Ok(());
    }

    if options.install_tracing {
        install_subscriber();
    }

    let config = EngineConfig::builder()
        .config_path(options.config_path.map(PathBuf::from))
        .max_steps(options.max_steps)
        .max_call_depth(options.max_call_depth)
        .trace_state_blocks(options.trace_state_blocks)
        .build()
        .context("Failed to load configuration")?;

    tracing::debug!(?config, "cadence initialized");

    INIT_STATE
        .set(InitState { config })
        .map_err(|_| anyhow!("Initialization already completed"))?;

    Ok(())
}

fn install_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_err() {
        tracing::debug!("a global tracing subscriber is already installed");
    }
}

/// Check if Cadence has been initialized
pub fn is_initialized() -> bool {
    INIT_STATE.get().is_some()
}

/// The installed configuration, if [`initialize`] has run
pub fn config() -> Option<&'static EngineConfig> {
    INIT_STATE.get().map(|state| &state.config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        InitBuilder::new().max_steps(500_000).init().unwrap();
        InitBuilder::new().max_steps(1).init().unwrap();

        assert!(is_initialized());
        // The first call wins
        assert_eq!(config().unwrap().max_steps, 500_000);
    }
}
