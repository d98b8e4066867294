//! Artifact validation and the bounded auto-fix loop.
//!
//! The validator itself is a pluggable collaborator; this module owns the
//! repair loop discipline: fixes are line-addressed and applied in
//! descending line order within a pass, so earlier insertions never shift
//! the line numbers of fixes still waiting to be applied.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One validation finding, addressed to a 1-based line/column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Result of validating one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: false,
            errors,
            warnings: Vec::new(),
        }
    }
}

/// A proposed repair: text to insert immediately after a 1-based line, or
/// appended to the artifact when no line is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFix {
    pub description: String,
    pub code: String,
    pub line: Option<usize>,
}

/// Validation status of the artifact a job returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// The artifact passed validation (possibly after auto-fixes).
    Validated,
    /// Generation finished but validation never passed; best artifact kept.
    Generated,
    /// The job itself failed; only partial output survives.
    Failed,
}

/// Externally supplied artifact validator.
pub trait ArtifactValidator: Send + Sync {
    fn validate(&self, artifact: &str) -> ValidationReport;
    fn suggest_fixes(&self, errors: &[ValidationIssue]) -> Vec<ArtifactFix>;
}

/// Outcome of the repair loop: the best artifact produced, its status, and
/// warnings describing any fixes applied.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub artifact: String,
    pub status: ArtifactStatus,
    pub warnings: Vec<String>,
    pub passes: u32,
}

/// Validate `artifact`; while invalid and passes remain, apply the
/// validator's suggested fixes and re-validate. Stops when valid, when no
/// fixes are offered, or when `max_passes` is exhausted.
pub fn run_repair_loop(
    validator: &dyn ArtifactValidator,
    mut artifact: String,
    max_passes: u32,
) -> RepairOutcome {
    let mut warnings = Vec::new();
    let mut passes = 0u32;
    let mut report = validator.validate(&artifact);
    warnings.extend(report.warnings.iter().cloned());

    while !report.valid && passes < max_passes {
        let fixes = validator.suggest_fixes(&report.errors);
        if fixes.is_empty() {
            break;
        }
        debug!(pass = passes + 1, fixes = fixes.len(), "applying auto-fixes");
        artifact = apply_fixes(&artifact, &fixes);
        passes += 1;
        warnings.push(format!(
            "auto-fix pass {passes} applied {} fix(es)",
            fixes.len()
        ));
        report = validator.validate(&artifact);
        warnings.extend(report.warnings.iter().cloned());
    }

    let status = if report.valid {
        ArtifactStatus::Validated
    } else {
        ArtifactStatus::Generated
    };
    RepairOutcome {
        artifact,
        status,
        warnings,
        passes,
    }
}

/// Apply one pass of fixes. Line-addressed fixes are processed in descending
/// line order — ascending order would shift the insertion points of fixes
/// later in the pass. Fixes without a line are appended at the end.
pub fn apply_fixes(artifact: &str, fixes: &[ArtifactFix]) -> String {
    let mut lines: Vec<String> = artifact.lines().map(str::to_string).collect();

    let mut line_fixes: Vec<&ArtifactFix> = fixes.iter().filter(|f| f.line.is_some()).collect();
    line_fixes.sort_by(|a, b| b.line.cmp(&a.line));
    for fix in line_fixes {
        let line = fix.line.unwrap_or(0);
        let index = line.min(lines.len());
        lines.insert(index, fix.code.clone());
    }

    for fix in fixes.iter().filter(|f| f.line.is_none()) {
        lines.push(fix.code.clone());
    }

    lines.join("\n")
}
