//! Resilient orchestrator: composes caching, isolation, retry, progress,
//! and partial-result tracking into a multi-stage generation job.
//!
//! Stage order is fixed: analyzing, planning, generating, validating, then
//! complete or failed. Unit failures are isolated and recorded; job-level
//! surprises are caught at the job boundary and converted into a failed
//! report carrying the best partial artifact.
//!
//! One pipeline instance carries per-job state (cache, error log, partial
//! results). Run one job per instance, or call `reset` between jobs;
//! reusing an instance without resetting leaks state across jobs. The
//! orchestrator imposes no cancellation or timeout of its own — a job runs
//! to completion or retry exhaustion, and deadline enforcement belongs to
//! the supplied backends.

use crate::backend::GenerationBackend;
use crate::cache::{CacheManager, CacheStats};
use crate::config::PipelineConfig;
use crate::error::{GenerationError, PipelineError, UnitOutcome};
use crate::isolation::{ErrorContext, ErrorHandler};
use crate::partial::{PartialResult, PartialResultManager};
use crate::pipeline::profile::JobProfile;
use crate::pipeline::report::PipelineReport;
use crate::progress::{ProgressEvent, ProgressTracker};
use crate::types::{new_job_id, CaseKind, CompletedUnit, GenerationUnit, Stage};
use crate::validation::{run_repair_loop, ArtifactStatus, ArtifactValidator};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

/// One planned generation: a unit index paired with the case kind to
/// produce for it.
#[derive(Debug, Clone, Copy)]
struct PlanItem {
    unit_index: usize,
    case: CaseKind,
}

/// The shared orchestration layer behind the documentation and test-suite
/// synthesizers.
pub struct GenerationPipeline {
    config: PipelineConfig,
    tracker: ProgressTracker,
    cache: AsyncMutex<CacheManager<String>>,
    errors: ErrorHandler,
    partials: Mutex<PartialResultManager>,
}

impl GenerationPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let tracker = ProgressTracker::with_interval(config.emit_interval());
        let cache = AsyncMutex::new(CacheManager::new(config.cache.max_size, config.cache_ttl()));
        let errors = ErrorHandler::new(config.retry_policy());
        Self {
            config,
            tracker,
            cache,
            errors,
            partials: Mutex::new(PartialResultManager::new()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Progress subscription surface; see `ProgressTracker::on_progress`.
    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Error query surface for the current job.
    pub fn error_handler(&self) -> &ErrorHandler {
        &self.errors
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    /// Clear all per-job state so the instance can run another job.
    pub async fn reset(&self) {
        self.tracker.reset();
        self.errors.clear_errors();
        self.partials.lock().clear();
        self.cache.lock().await.clear();
    }

    /// Run one generation job over `units`, producing a best-effort report
    /// even on partial failure.
    pub async fn run_job(
        &self,
        units: &[GenerationUnit],
        primary: Arc<dyn GenerationBackend>,
        fallback: Arc<dyn GenerationBackend>,
        validator: &dyn ArtifactValidator,
        profile: &JobProfile,
    ) -> PipelineReport {
        let job_id = new_job_id();
        info!(
            job_id = %job_id,
            kind = profile.kind.as_str(),
            units = units.len(),
            "starting generation job"
        );
        self.partials.lock().create(&job_id);

        let transcript: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&transcript);
        let subscription = self
            .tracker
            .on_progress(move |event| sink.lock().push(event.clone()));

        let warnings: Mutex<Vec<String>> = Mutex::new(Vec::new());
        let outcome = self
            .run_stages(&job_id, units, &primary, &fallback, validator, profile, &warnings)
            .await;

        if let Err(err) = &outcome {
            warn!(job_id = %job_id, error = %err, "generation job failed");
            self.partials.lock().update_stage(&job_id, Stage::Failed);
            self.tracker
                .start_stage(Stage::Failed, 0, format!("job failed: {err}"));
        }

        self.tracker.off_progress(subscription);

        // Partial results never outlive the job; snapshot before removal.
        let partial = self
            .partials
            .lock()
            .remove(&job_id)
            .unwrap_or(PartialResult {
                job_id: job_id.clone(),
                stage: Stage::Failed,
                completed_units: Vec::new(),
                failed_unit_ids: Vec::new(),
                partial_artifact: None,
            });

        let mut errors: Vec<String> = self.errors.errors().iter().map(|e| e.to_string()).collect();
        let warnings = warnings.into_inner();
        let progress = transcript.lock().clone();

        match outcome {
            Ok((artifact, status)) => PipelineReport {
                job_id,
                success: true,
                status,
                artifact: Some(artifact),
                completed_units: partial.completed_units,
                failed_unit_ids: partial.failed_unit_ids,
                errors,
                warnings,
                progress,
            },
            Err(err) => {
                errors.push(err.to_string());
                PipelineReport {
                    job_id,
                    success: false,
                    status: ArtifactStatus::Failed,
                    artifact: partial.partial_artifact,
                    completed_units: partial.completed_units,
                    failed_unit_ids: partial.failed_unit_ids,
                    errors,
                    warnings,
                    progress,
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_stages(
        &self,
        job_id: &str,
        units: &[GenerationUnit],
        primary: &Arc<dyn GenerationBackend>,
        fallback: &Arc<dyn GenerationBackend>,
        validator: &dyn ArtifactValidator,
        profile: &JobProfile,
        warnings: &Mutex<Vec<String>>,
    ) -> Result<(String, ArtifactStatus), PipelineError> {
        validate_units(units)?;

        // Analyzing: content-addressed, so unchanged units hit the cache.
        self.set_stage(job_id, Stage::Analyzing);
        let analyses = self
            .process_units_with_isolation(
                units,
                |unit| {
                    let key = format!("analysis:{}", unit.id);
                    async move {
                        self.execute_with_cache(&key, Some(&unit.source), || async move {
                            Ok(analyze_unit(unit))
                        })
                        .await
                    }
                },
                Stage::Analyzing,
                "analyzing units",
            )
            .await;
        for (unit, analysis) in units.iter().zip(&analyses) {
            if analysis.is_err() {
                self.partials.lock().record_failure(job_id, &unit.id);
            }
        }

        // Planning: analyzable units fan out over the profile's case kinds.
        self.set_stage(job_id, Stage::Planning);
        self.tracker
            .start_stage(Stage::Planning, units.len(), "planning generation");
        let mut plan: Vec<PlanItem> = Vec::new();
        for (unit_index, analysis) in analyses.iter().enumerate() {
            if analysis.is_ok() {
                for case in &profile.cases {
                    plan.push(PlanItem {
                        unit_index,
                        case: *case,
                    });
                }
            }
            self.tracker.increment_progress(None);
        }
        self.tracker.complete_stage(Some("plan ready"));
        debug!(job_id = %job_id, items = plan.len(), "generation plan built");

        // Generating: concurrent fan-out, one isolated retry chain per item.
        self.set_stage(job_id, Stage::Generating);
        self.tracker
            .start_stage(Stage::Generating, plan.len(), "generating artifacts");
        let mut slots: Vec<Option<UnitOutcome<String>>> = Vec::new();
        slots.resize_with(plan.len(), || None);
        let mut tasks = FuturesUnordered::new();
        for (slot, item) in plan.iter().enumerate() {
            let unit = &units[item.unit_index];
            let case = item.case;
            let primary = Arc::clone(primary);
            let fallback = Arc::clone(fallback);
            tasks.push(async move {
                let ctx = ErrorContext::for_file(Stage::Generating, &unit.path);
                let make_primary = move || {
                    let primary = Arc::clone(&primary);
                    async move { primary.generate(unit, case).await }
                };
                let fallback_name = fallback.name().to_string();
                let fallback_op = async move { fallback.generate(unit, case).await };
                let (outcome, fallback_used) = self
                    .execute_ai_with_fallback(make_primary, fallback_op, &ctx)
                    .await;
                (slot, outcome, fallback_used, fallback_name)
            });
        }
        while let Some((slot, outcome, fallback_used, fallback_name)) = tasks.next().await {
            let item = plan[slot];
            let unit = &units[item.unit_index];
            match &outcome {
                Ok(text) => self.partials.lock().record_success(
                    job_id,
                    CompletedUnit {
                        unit_id: unit.id.clone(),
                        case: item.case,
                        artifact: text.clone(),
                    },
                ),
                Err(_) => self.partials.lock().record_failure(job_id, &unit.id),
            }
            if fallback_used {
                warnings.lock().push(format!(
                    "unit `{}` ({}): fallback backend '{}' substituted after non-recoverable primary failure",
                    unit.id,
                    item.case.as_str(),
                    fallback_name
                ));
            }
            slots[slot] = Some(outcome);
            self.tracker.increment_progress(Some(&unit.path));
        }
        self.tracker.complete_stage(Some("generation finished"));
        let outcomes: Vec<UnitOutcome<String>> = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(GenerationError::new(
                        None,
                        Stage::Generating,
                        "generation task vanished",
                        false,
                    ))
                })
            })
            .collect();

        let artifact = assemble_artifact(profile, units, &analyses, &plan, &outcomes);
        self.partials.lock().set_artifact(job_id, artifact.clone());

        // Validating: bounded auto-fix loop over the assembled artifact.
        self.set_stage(job_id, Stage::Validating);
        self.tracker
            .start_stage(Stage::Validating, 1, "validating artifact");
        let repair = run_repair_loop(validator, artifact, self.config.validation.max_fix_passes);
        warnings.lock().extend(repair.warnings.iter().cloned());
        self.partials
            .lock()
            .set_artifact(job_id, repair.artifact.clone());
        self.tracker.complete_stage(Some("validation finished"));

        self.set_stage(job_id, Stage::Complete);
        self.tracker.start_stage(Stage::Complete, 0, "job complete");
        Ok((repair.artifact, repair.status))
    }

    /// Run `processor` over every unit concurrently with per-unit isolation,
    /// reporting the whole batch as one progress stage. Both successes and
    /// failures advance the progress count; the output preserves input
    /// order.
    pub async fn process_units_with_isolation<'a, T, F, Fut>(
        &'a self,
        units: &'a [GenerationUnit],
        mut processor: F,
        stage: Stage,
        message: &str,
    ) -> Vec<UnitOutcome<T>>
    where
        F: FnMut(&'a GenerationUnit) -> Fut,
        Fut: Future<Output = Result<T, PipelineError>> + 'a,
    {
        self.tracker.start_stage(stage, units.len(), message);
        let mut slots: Vec<Option<UnitOutcome<T>>> = Vec::new();
        slots.resize_with(units.len(), || None);
        let mut tasks = FuturesUnordered::new();
        for (index, unit) in units.iter().enumerate() {
            let ctx = ErrorContext::for_file(stage, &unit.path);
            let fut = processor(unit);
            tasks.push(async move {
                (
                    index,
                    self.errors.execute_with_isolation(fut, &ctx).await,
                    unit,
                )
            });
        }
        while let Some((index, outcome, unit)) = tasks.next().await {
            slots[index] = Some(outcome);
            self.tracker.increment_progress(Some(&unit.path));
        }
        self.tracker.complete_stage(None);
        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(GenerationError::new(None, stage, "unit task vanished", false))
                })
            })
            .collect()
    }

    /// Cached sub-step: look up `key` against the hash of `content`, falling
    /// back to `compute`. With `content` absent the stored hash covers the
    /// serialized value instead, which is a weaker invalidation guarantee.
    pub async fn execute_with_cache<F, Fut>(
        &self,
        key: &str,
        content: Option<&str>,
        compute: F,
    ) -> Result<String, PipelineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, PipelineError>>,
    {
        let mut cache = self.cache.lock().await;
        cache.get_or_compute(key, content, compute).await
    }

    /// AI-with-fallback policy: retry `primary` to exhaustion; only a
    /// non-recoverable final error is given one isolated `fallback` attempt.
    /// Recoverable failures are never substituted — retries are presumed to
    /// eventually succeed, and a silent template would mask a real outage.
    /// Returns the outcome plus whether the fallback produced it.
    pub async fn execute_ai_with_fallback<T, F, Fut, FbFut>(
        &self,
        primary: F,
        fallback: FbFut,
        ctx: &ErrorContext,
    ) -> (UnitOutcome<T>, bool)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
        FbFut: Future<Output = Result<T, PipelineError>>,
    {
        match self.errors.execute_with_retry(primary, ctx).await {
            Ok(value) => (Ok(value), false),
            Err(err) if !err.recoverable => {
                debug!(
                    stage = %ctx.stage,
                    file_path = ctx.file_path.as_deref().unwrap_or("-"),
                    "primary exhausted with non-recoverable error, trying fallback"
                );
                match self.errors.execute_with_isolation(fallback, ctx).await {
                    Ok(value) => (Ok(value), true),
                    Err(fallback_err) => (Err(fallback_err), false),
                }
            }
            Err(err) => (Err(err), false),
        }
    }

    fn set_stage(&self, job_id: &str, stage: Stage) {
        self.partials.lock().update_stage(job_id, stage);
    }
}

fn validate_units(units: &[GenerationUnit]) -> Result<(), PipelineError> {
    if units.is_empty() {
        return Err(PipelineError::InvalidInput(
            "generation requires at least one unit".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for unit in units {
        if !seen.insert(unit.id.as_str()) {
            return Err(PipelineError::InvalidInput(format!(
                "duplicate unit id `{}`",
                unit.id
            )));
        }
    }
    Ok(())
}

/// Cheap structural summary of a unit, cached by content hash.
fn analyze_unit(unit: &GenerationUnit) -> String {
    let line_count = unit.source.lines().count();
    let branch_hints = ["if ", "for ", "while ", "case ", "catch "]
        .iter()
        .map(|needle| unit.source.matches(needle).count())
        .sum::<usize>();
    format!(
        "{} `{}`: {} lines, {} branch hint(s)",
        unit.kind.as_str(),
        unit.id,
        line_count,
        branch_hints
    )
}

fn assemble_artifact(
    profile: &JobProfile,
    units: &[GenerationUnit],
    analyses: &[UnitOutcome<String>],
    plan: &[PlanItem],
    outcomes: &[UnitOutcome<String>],
) -> String {
    let mut sections = vec![format!("# {}", profile.artifact_title())];
    for (unit_index, unit) in units.iter().enumerate() {
        let items: Vec<usize> = plan
            .iter()
            .enumerate()
            .filter(|(_, item)| item.unit_index == unit_index)
            .map(|(slot, _)| slot)
            .collect();
        if items.is_empty() {
            continue;
        }
        let mut section = format!("## {}", unit.path);
        if let Ok(summary) = &analyses[unit_index] {
            section.push_str(&format!("\n\n{summary}"));
        }
        let mut produced = 0usize;
        for slot in items {
            if let Ok(text) = &outcomes[slot] {
                section.push_str(&format!("\n\n### {}\n\n{}", plan[slot].case.label(), text));
                produced += 1;
            }
        }
        if produced == 0 {
            section.push_str("\n\nNo artifact could be generated for this unit.");
        }
        sections.push(section);
    }
    sections.join("\n\n")
}
