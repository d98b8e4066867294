//! Shared fixtures for pipeline integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use relic::backend::GenerationBackend;
use relic::config::PipelineConfig;
use relic::error::PipelineError;
use relic::types::{CaseKind, GenerationUnit, UnitKind};
use relic::validation::{ArtifactFix, ArtifactValidator, ValidationIssue, ValidationReport};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

pub fn sample_units(ids: &[&str]) -> Vec<GenerationUnit> {
    ids.iter()
        .map(|id| {
            GenerationUnit::new(
                *id,
                format!("src/{id}.js"),
                UnitKind::Function,
                format!("function {id}(input) {{ if (!input) throw new Error('bad'); return input; }}"),
            )
        })
        .collect()
}

/// Config with a negligible backoff so retry chains finish quickly.
pub fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.retry.base_delay_ms = 1;
    config
}

/// Backend that fails a fixed number of times per (unit, case) before
/// succeeding, counting every invocation.
pub struct FlakyBackend {
    remaining: Mutex<HashMap<(String, CaseKind), u32>>,
    failures_before_success: u32,
    error: PipelineError,
    calls: AtomicU32,
}

impl FlakyBackend {
    pub fn new(failures_before_success: u32, error: PipelineError) -> Self {
        Self {
            remaining: Mutex::new(HashMap::new()),
            failures_before_success,
            error,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for FlakyBackend {
    async fn generate(
        &self,
        unit: &GenerationUnit,
        case: CaseKind,
    ) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut remaining = self.remaining.lock();
        let left = remaining
            .entry((unit.id.clone(), case))
            .or_insert(self.failures_before_success);
        if *left > 0 {
            *left -= 1;
            Err(self.error.clone())
        } else {
            Ok(format!("{} for `{}`", case.as_str(), unit.id))
        }
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Backend that fails every call with a fixed error.
pub struct AlwaysFailBackend {
    error: PipelineError,
}

impl AlwaysFailBackend {
    pub fn new(error: PipelineError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl GenerationBackend for AlwaysFailBackend {
    async fn generate(
        &self,
        _unit: &GenerationUnit,
        _case: CaseKind,
    ) -> Result<String, PipelineError> {
        Err(self.error.clone())
    }

    fn name(&self) -> &str {
        "always-fail"
    }
}

/// Validator that accepts everything.
pub struct AcceptAllValidator;

impl ArtifactValidator for AcceptAllValidator {
    fn validate(&self, _artifact: &str) -> ValidationReport {
        ValidationReport::valid()
    }

    fn suggest_fixes(&self, _errors: &[ValidationIssue]) -> Vec<ArtifactFix> {
        Vec::new()
    }
}

/// Validator that reports the artifact invalid until a marker line has been
/// inserted by an auto-fix pass.
pub struct MarkerValidator {
    pub marker: &'static str,
}

impl ArtifactValidator for MarkerValidator {
    fn validate(&self, artifact: &str) -> ValidationReport {
        if artifact.contains(self.marker) {
            ValidationReport::valid()
        } else {
            ValidationReport::invalid(vec![ValidationIssue {
                message: format!("missing `{}` preamble", self.marker),
                line: 1,
                column: 1,
            }])
        }
    }

    fn suggest_fixes(&self, errors: &[ValidationIssue]) -> Vec<ArtifactFix> {
        errors
            .iter()
            .map(|issue| ArtifactFix {
                description: issue.message.clone(),
                code: self.marker.to_string(),
                line: Some(issue.line),
            })
            .collect()
    }
}
