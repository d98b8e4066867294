//! Error types for the resilient generation pipeline.

use crate::types::{now_millis, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced by pipeline operations and pluggable collaborators.
///
/// Recoverability is not encoded in the variant: classification happens on
/// the rendered message so foreign providers' error strings classify the
/// same way (see `isolation::RecoverabilityMatcher`).
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::Config(err.to_string())
    }
}

/// A recorded unit-level failure.
///
/// Appended to the owning `ErrorHandler`'s log; never removed except by an
/// explicit `clear_errors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationError {
    /// Path of the unit that failed, when the failure is unit-scoped.
    pub file_path: Option<String>,
    pub stage: Stage,
    pub message: String,
    pub timestamp_ms: u64,
    /// Whether the failure is classified as transient (rate limit, timeout,
    /// network). Drives the fallback decision, not the retry loop.
    pub recoverable: bool,
}

impl GenerationError {
    pub fn new(
        file_path: Option<String>,
        stage: Stage,
        message: impl Into<String>,
        recoverable: bool,
    ) -> Self {
        Self {
            file_path,
            stage,
            message: message.into(),
            timestamp_ms: now_millis(),
            recoverable,
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file_path {
            Some(path) => write!(f, "[{}] {}: {}", self.stage, path, self.message),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Outcome of one isolated unit operation. Exactly one side is populated by
/// construction; the failure side carries the recorded error.
pub type UnitOutcome<T> = Result<T, GenerationError>;
