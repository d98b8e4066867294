//! Event schema for job progress observability.

use crate::types::{now_millis, Stage};
use serde::{Deserialize, Serialize};

/// One observed point of job progress. Value object; never mutated after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub current: usize,
    pub total: usize,
    pub message: String,
    pub timestamp_ms: u64,
}

impl ProgressEvent {
    pub(crate) fn new(stage: Stage, current: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            stage,
            current,
            total,
            message: message.into(),
            timestamp_ms: now_millis(),
        }
    }
}
