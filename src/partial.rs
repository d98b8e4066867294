//! Best-effort partial results for jobs that may not finish cleanly.
//!
//! A `PartialResult` is created at job start, mutated only by the owning job,
//! and removed at job end regardless of outcome — callers copy the snapshot
//! into the returned report before removal.

use crate::types::{CompletedUnit, Stage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Accumulated per-job output, retained even when the job ultimately fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialResult {
    pub job_id: String,
    pub stage: Stage,
    pub completed_units: Vec<CompletedUnit>,
    pub failed_unit_ids: Vec<String>,
    pub partial_artifact: Option<String>,
}

impl PartialResult {
    fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage: Stage::Analyzing,
            completed_units: Vec::new(),
            failed_unit_ids: Vec::new(),
            partial_artifact: None,
        }
    }
}

/// Tracks partial results for in-flight jobs. One instance per orchestrator;
/// entries must not outlive their job.
#[derive(Debug, Default)]
pub struct PartialResultManager {
    jobs: HashMap<String, PartialResult>,
}

impl PartialResultManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, job_id: &str) {
        self.jobs
            .insert(job_id.to_string(), PartialResult::new(job_id));
    }

    pub fn update_stage(&mut self, job_id: &str, stage: Stage) {
        if let Some(partial) = self.jobs.get_mut(job_id) {
            partial.stage = stage;
        }
    }

    pub fn record_success(&mut self, job_id: &str, unit: CompletedUnit) {
        if let Some(partial) = self.jobs.get_mut(job_id) {
            partial.completed_units.push(unit);
        }
    }

    pub fn record_failure(&mut self, job_id: &str, unit_id: &str) {
        if let Some(partial) = self.jobs.get_mut(job_id) {
            if !partial.failed_unit_ids.iter().any(|id| id == unit_id) {
                partial.failed_unit_ids.push(unit_id.to_string());
            }
        }
    }

    pub fn set_artifact(&mut self, job_id: &str, artifact: String) {
        if let Some(partial) = self.jobs.get_mut(job_id) {
            partial.partial_artifact = Some(artifact);
        }
    }

    pub fn get(&self, job_id: &str) -> Option<&PartialResult> {
        self.jobs.get(job_id)
    }

    /// Remove and return the job's partial result. Called at job end
    /// regardless of success.
    pub fn remove(&mut self, job_id: &str) -> Option<PartialResult> {
        self.jobs.remove(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}
