//! Shared types for the generation pipeline: units of work, pipeline stages,
//! and job identity helpers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static JOB_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Fixed pipeline stages, reported in order for every job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Analyzing,
    Planning,
    Generating,
    Validating,
    Complete,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Analyzing => "analyzing",
            Stage::Planning => "planning",
            Stage::Generating => "generating",
            Stage::Validating => "validating",
            Stage::Complete => "complete",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of code unit an artifact is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    File,
    Function,
    Class,
}

impl UnitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::File => "file",
            UnitKind::Function => "function",
            UnitKind::Class => "class",
        }
    }
}

/// Sub-kind of artifact generated per unit during the fan-out stage.
///
/// Test-suite jobs fan out over the three case kinds; documentation jobs
/// generate a single overview per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    Overview,
    HappyPath,
    EdgeCase,
    ErrorCase,
}

impl CaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CaseKind::Overview => "overview",
            CaseKind::HappyPath => "happy_path",
            CaseKind::EdgeCase => "edge_case",
            CaseKind::ErrorCase => "error_case",
        }
    }

    /// Human label used in assembled artifacts.
    pub fn label(self) -> &'static str {
        match self {
            CaseKind::Overview => "Overview",
            CaseKind::HappyPath => "Happy path",
            CaseKind::EdgeCase => "Edge cases",
            CaseKind::ErrorCase => "Error handling",
        }
    }
}

/// One independent unit of generation work: a file, function, or class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationUnit {
    /// Caller-chosen stable identifier, unique within a job.
    pub id: String,
    /// Source path the unit came from.
    pub path: String,
    pub kind: UnitKind,
    /// Source text of the unit. Hashed for cache invalidation.
    pub source: String,
}

impl GenerationUnit {
    pub fn new(
        id: impl Into<String>,
        path: impl Into<String>,
        kind: UnitKind,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            kind,
            source: source.into(),
        }
    }
}

/// A successfully generated per-unit artifact snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedUnit {
    pub unit_id: String,
    pub case: CaseKind,
    pub artifact: String,
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a process-unique job identifier.
pub fn new_job_id() -> String {
    let ts = now_millis();
    let pid = std::process::id();
    let seq = JOB_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("job-{ts}-{pid}-{seq}")
}
