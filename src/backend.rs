//! Generation backend abstraction.
//!
//! The pipeline never constructs prompts or talks to a provider SDK; it
//! calls a `GenerationBackend` and cares only about its success, failure,
//! and timeout contract. Prompt construction and transport live behind
//! implementations supplied by the caller.

use crate::error::PipelineError;
use crate::types::{CaseKind, GenerationUnit};
use async_trait::async_trait;

/// One artifact-producing collaborator: the primary AI-backed path or the
/// deterministic fallback.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Produce the artifact snippet for one unit and case kind.
    async fn generate(&self, unit: &GenerationUnit, case: CaseKind)
        -> Result<String, PipelineError>;

    /// Backend name used in warnings and logs.
    fn name(&self) -> &str;
}

/// Deterministic template backend: renders a skeletal artifact from unit
/// metadata alone, with no network dependency. Used as the degrade path when
/// the primary backend fails unrecoverably, and as a stand-in in tests.
#[derive(Debug, Clone, Default)]
pub struct TemplateBackend;

impl TemplateBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GenerationBackend for TemplateBackend {
    async fn generate(
        &self,
        unit: &GenerationUnit,
        case: CaseKind,
    ) -> Result<String, PipelineError> {
        let line_count = unit.source.lines().count();
        let text = match case {
            CaseKind::Overview => format!(
                "{} `{}` in `{}` ({} source lines). \
                 Skeletal summary generated without provider assistance; \
                 describes structure only.",
                unit.kind.as_str(),
                unit.id,
                unit.path,
                line_count
            ),
            CaseKind::HappyPath => format!(
                "Test `{}::nominal`: invoke `{}` with representative valid input \
                 and assert it completes without error.",
                unit.id, unit.id
            ),
            CaseKind::EdgeCase => format!(
                "Test `{}::boundaries`: exercise `{}` with empty, maximal, and \
                 boundary-valued inputs.",
                unit.id, unit.id
            ),
            CaseKind::ErrorCase => format!(
                "Test `{}::failures`: invoke `{}` with malformed input and assert \
                 the reported error is surfaced, not swallowed.",
                unit.id, unit.id
            ),
        };
        Ok(text)
    }

    fn name(&self) -> &str {
        "template"
    }
}
