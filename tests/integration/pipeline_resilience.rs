//! End-to-end resilience behavior of the generation pipeline.

use crate::integration::support::{
    fast_config, sample_units, AcceptAllValidator, AlwaysFailBackend, FlakyBackend,
    MarkerValidator,
};
use relic::backend::TemplateBackend;
use relic::error::PipelineError;
use relic::pipeline::{GenerationPipeline, JobProfile};
use relic::types::Stage;
use relic::validation::ArtifactStatus;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_to_success() {
    let pipeline = GenerationPipeline::new(fast_config());
    let primary = Arc::new(FlakyBackend::new(
        2,
        PipelineError::Timeout("provider slow".to_string()),
    ));
    let units = sample_units(&["alpha"]);

    let report = pipeline
        .run_job(
            &units,
            Arc::clone(&primary) as Arc<dyn relic::backend::GenerationBackend>,
            Arc::new(TemplateBackend::new()),
            &AcceptAllValidator,
            &JobProfile::documentation(),
        )
        .await;

    assert!(report.success);
    assert_eq!(report.status, ArtifactStatus::Validated);
    assert!(report.failed_unit_ids.is_empty());
    assert!(report.warnings.is_empty());
    // One case, two failures then success: exactly three invocations.
    assert_eq!(primary.calls(), 3);
    // Transient errors that eventually succeeded leave no recorded error.
    assert!(!pipeline.error_handler().has_errors());
}

#[tokio::test(start_paused = true)]
async fn exhausted_recoverable_failure_marks_unit_failed_without_fallback() {
    let pipeline = GenerationPipeline::new(fast_config());
    let units = sample_units(&["limited"]);

    let report = pipeline
        .run_job(
            &units,
            Arc::new(AlwaysFailBackend::new(PipelineError::RateLimited(
                "try again".to_string(),
            ))),
            Arc::new(TemplateBackend::new()),
            &AcceptAllValidator,
            &JobProfile::documentation(),
        )
        .await;

    // The unit failed but the job still returns a best-effort report.
    assert!(report.success);
    assert_eq!(report.failed_unit_ids, vec!["limited".to_string()]);
    assert!(report.completed_units.is_empty());
    assert!(report.warnings.is_empty());

    let errors = pipeline.error_handler().errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].recoverable);
    assert_eq!(errors[0].stage, Stage::Generating);
    assert_eq!(
        pipeline.error_handler().errors_for_file("src/limited.js").len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn non_recoverable_failure_uses_fallback_and_warns() {
    let pipeline = GenerationPipeline::new(fast_config());
    let units = sample_units(&["mangled"]);

    let report = pipeline
        .run_job(
            &units,
            Arc::new(AlwaysFailBackend::new(PipelineError::Provider(
                "Invalid syntax in unit source".to_string(),
            ))),
            Arc::new(TemplateBackend::new()),
            &AcceptAllValidator,
            &JobProfile::documentation(),
        )
        .await;

    assert!(report.success);
    assert!(report.degraded());
    assert_eq!(report.completed_units.len(), 1);
    assert!(report.failed_unit_ids.is_empty());
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("fallback") && w.contains("mangled")));
}

#[tokio::test(start_paused = true)]
async fn mixed_batch_isolates_each_unit() {
    let pipeline = GenerationPipeline::new(fast_config());
    // Fails twice with a transient error, so every unit succeeds on the
    // third attempt of every case.
    let primary = Arc::new(FlakyBackend::new(
        2,
        PipelineError::Network("connection reset by peer".to_string()),
    ));
    let units = sample_units(&["one", "two", "three"]);

    let report = pipeline
        .run_job(
            &units,
            primary,
            Arc::new(TemplateBackend::new()),
            &AcceptAllValidator,
            &JobProfile::test_suite(),
        )
        .await;

    assert!(report.success);
    assert_eq!(report.completed_units.len(), 9);
    assert!(report.failed_unit_ids.is_empty());
    let artifact = report.artifact.unwrap();
    for unit in ["one", "two", "three"] {
        assert!(artifact.contains(&format!("## src/{unit}.js")));
    }
}

#[tokio::test(start_paused = true)]
async fn auto_fix_loop_repairs_artifact() {
    let pipeline = GenerationPipeline::new(fast_config());
    let units = sample_units(&["alpha"]);
    let validator = MarkerValidator {
        marker: "// prelude: generated suite",
    };

    let report = pipeline
        .run_job(
            &units,
            Arc::new(TemplateBackend::new()),
            Arc::new(TemplateBackend::new()),
            &validator,
            &JobProfile::test_suite(),
        )
        .await;

    assert!(report.success);
    assert_eq!(report.status, ArtifactStatus::Validated);
    assert!(report.degraded());
    assert!(report.artifact.unwrap().contains("// prelude: generated suite"));
    assert!(report.warnings.iter().any(|w| w.contains("auto-fix")));
}

#[tokio::test(start_paused = true)]
async fn reset_allows_reusing_one_pipeline_for_unrelated_jobs() {
    let pipeline = GenerationPipeline::new(fast_config());
    let units = sample_units(&["alpha"]);

    let first = pipeline
        .run_job(
            &units,
            Arc::new(AlwaysFailBackend::new(PipelineError::RateLimited(
                "slow down".to_string(),
            ))),
            Arc::new(TemplateBackend::new()),
            &AcceptAllValidator,
            &JobProfile::documentation(),
        )
        .await;
    assert_eq!(first.failed_unit_ids.len(), 1);
    assert!(pipeline.error_handler().has_errors());

    pipeline.reset().await;
    assert!(!pipeline.error_handler().has_errors());

    let second = pipeline
        .run_job(
            &units,
            Arc::new(TemplateBackend::new()),
            Arc::new(TemplateBackend::new()),
            &AcceptAllValidator,
            &JobProfile::documentation(),
        )
        .await;
    assert!(second.success);
    assert!(second.failed_unit_ids.is_empty());
    // Errors from the first job did not leak into the second report.
    assert!(second.errors.is_empty());
}
