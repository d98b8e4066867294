//! Job result surface returned to callers.

use crate::progress::ProgressEvent;
use crate::types::CompletedUnit;
use crate::validation::ArtifactStatus;
use serde::{Deserialize, Serialize};

/// Final report of one generation job.
///
/// `success: true` with non-empty `warnings` is the degraded-success state
/// (fallback used, or auto-fixes applied) — distinct from `success: false`,
/// where only the salvaged partial artifact survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub job_id: String,
    pub success: bool,
    pub status: ArtifactStatus,
    /// Assembled artifact: the test suite or documentation text. On failure
    /// this carries whatever the partial result had accumulated.
    pub artifact: Option<String>,
    pub completed_units: Vec<CompletedUnit>,
    pub failed_unit_ids: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Ordered transcript of every progress event the job emitted.
    pub progress: Vec<ProgressEvent>,
}

impl PipelineReport {
    /// The job succeeded but substituted a fallback or applied fixes.
    pub fn degraded(&self) -> bool {
        self.success && !self.warnings.is_empty()
    }
}
