//! Documentation and test-suite synthesis.
//!
//! The two product subsystems share one resilient pipeline and differ only
//! in their job profile: which case kinds the generating stage fans out
//! over and how the artifact is titled. Everything failure-related —
//! isolation, retry, fallback, partial results — lives in the pipeline.

use crate::backend::GenerationBackend;
use crate::config::PipelineConfig;
use crate::pipeline::{GenerationPipeline, JobProfile, PipelineReport};
use crate::types::GenerationUnit;
use crate::validation::ArtifactValidator;
use std::sync::Arc;

/// Generates a test suite for a set of legacy-code units.
pub struct TestSuiteSynthesizer {
    pipeline: GenerationPipeline,
    primary: Arc<dyn GenerationBackend>,
    fallback: Arc<dyn GenerationBackend>,
    validator: Arc<dyn ArtifactValidator>,
}

impl TestSuiteSynthesizer {
    pub fn new(
        config: PipelineConfig,
        primary: Arc<dyn GenerationBackend>,
        fallback: Arc<dyn GenerationBackend>,
        validator: Arc<dyn ArtifactValidator>,
    ) -> Self {
        Self {
            pipeline: GenerationPipeline::new(config),
            primary,
            fallback,
            validator,
        }
    }

    /// Run one synthesis job. The pipeline instance accumulates per-job
    /// state; call `pipeline().reset()` before reusing this synthesizer for
    /// an unrelated job.
    pub async fn synthesize(&self, units: &[GenerationUnit]) -> PipelineReport {
        self.pipeline
            .run_job(
                units,
                Arc::clone(&self.primary),
                Arc::clone(&self.fallback),
                self.validator.as_ref(),
                &JobProfile::test_suite(),
            )
            .await
    }

    pub fn pipeline(&self) -> &GenerationPipeline {
        &self.pipeline
    }
}

/// Generates documentation for a set of legacy-code units.
pub struct DocumentationSynthesizer {
    pipeline: GenerationPipeline,
    primary: Arc<dyn GenerationBackend>,
    fallback: Arc<dyn GenerationBackend>,
    validator: Arc<dyn ArtifactValidator>,
}

impl DocumentationSynthesizer {
    pub fn new(
        config: PipelineConfig,
        primary: Arc<dyn GenerationBackend>,
        fallback: Arc<dyn GenerationBackend>,
        validator: Arc<dyn ArtifactValidator>,
    ) -> Self {
        Self {
            pipeline: GenerationPipeline::new(config),
            primary,
            fallback,
            validator,
        }
    }

    /// Run one synthesis job; see `TestSuiteSynthesizer::synthesize` for the
    /// reuse contract.
    pub async fn synthesize(&self, units: &[GenerationUnit]) -> PipelineReport {
        self.pipeline
            .run_job(
                units,
                Arc::clone(&self.primary),
                Arc::clone(&self.fallback),
                self.validator.as_ref(),
                &JobProfile::documentation(),
            )
            .await
    }

    pub fn pipeline(&self) -> &GenerationPipeline {
        &self.pipeline
    }
}
