//! Configuration for pipeline behavior.
//!
//! Hierarchical configuration with serde defaults, loadable from a TOML file
//! and overridable through `RELIC_`-prefixed environment variables
//! (e.g. `RELIC_RETRY__MAX_ATTEMPTS=5`).

use crate::error::PipelineError;
use crate::isolation::RetryPolicy;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub progress: ProgressConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Retry behavior for the primary generation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds; attempt n waits base * 2^n.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

/// Bounds for the per-job computation cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,

    /// Entry time-to-live in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,
}

/// Progress emission throttling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Minimum interval between throttled emissions, in milliseconds.
    /// Stage boundaries always emit regardless.
    #[serde(default = "default_emit_interval_ms")]
    pub min_emit_interval_ms: u64,
}

/// Bounds for the validate-and-fix loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_max_fix_passes")]
    pub max_fix_passes: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_cache_max_size() -> usize {
    100
}

fn default_cache_ttl_ms() -> u64 {
    1000 * 60 * 60
}

fn default_emit_interval_ms() -> u64 {
    100
}

fn default_max_fix_passes() -> u32 {
    3
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_cache_max_size(),
            ttl_ms: default_cache_ttl_ms(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            min_emit_interval_ms: default_emit_interval_ms(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_fix_passes: default_max_fix_passes(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an optional TOML file plus `RELIC_`
    /// environment overrides. Missing sections fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix("RELIC").separator("__"));
        let settings = builder.build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.ttl_ms)
    }

    pub fn emit_interval(&self) -> Duration {
        Duration::from_millis(self.progress.min_emit_interval_ms)
    }
}
