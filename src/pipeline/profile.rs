//! Job profiles: what kind of artifact a job produces and which case kinds
//! the generating stage fans out over.

use crate::types::CaseKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Documentation,
    TestSuite,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Documentation => "documentation",
            ArtifactKind::TestSuite => "test_suite",
        }
    }
}

/// Per-job generation profile. The documentation and test-suite subsystems
/// share one pipeline and differ only here.
#[derive(Debug, Clone)]
pub struct JobProfile {
    pub kind: ArtifactKind,
    /// Case kinds generated per unit, each independently retried and
    /// isolated.
    pub cases: Vec<CaseKind>,
}

impl JobProfile {
    pub fn documentation() -> Self {
        Self {
            kind: ArtifactKind::Documentation,
            cases: vec![CaseKind::Overview],
        }
    }

    pub fn test_suite() -> Self {
        Self {
            kind: ArtifactKind::TestSuite,
            cases: vec![CaseKind::HappyPath, CaseKind::EdgeCase, CaseKind::ErrorCase],
        }
    }

    pub fn artifact_title(&self) -> &'static str {
        match self.kind {
            ArtifactKind::Documentation => "Generated Documentation",
            ArtifactKind::TestSuite => "Generated Test Suite",
        }
    }
}
