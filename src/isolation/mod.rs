//! Failure isolation, retry with exponential backoff, and recoverability
//! classification for fallible generation operations.
//!
//! Unit-level failures are recorded and returned, never propagated past the
//! unit boundary. One `ErrorHandler` is scoped to one job; its error log
//! accumulates for the life of the instance.

use crate::error::{GenerationError, PipelineError, UnitOutcome};
use crate::types::Stage;
use parking_lot::Mutex;
use regex::RegexSet;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Read-only retry configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before attempt n+1 is `base_delay * 2^n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Where and for what a failing operation ran.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub file_path: Option<String>,
    pub stage: Stage,
}

impl ErrorContext {
    pub fn new(stage: Stage) -> Self {
        Self {
            file_path: None,
            stage,
        }
    }

    pub fn for_file(stage: Stage, path: impl Into<String>) -> Self {
        Self {
            file_path: Some(path.into()),
            stage,
        }
    }
}

/// Injectable predicate deciding whether an error message describes a
/// transient condition.
///
/// The default set covers rate limits, timeouts, and network resets; callers
/// integrating a new provider can extend it with that provider's error
/// strings instead of patching the handler.
#[derive(Debug, Clone)]
pub struct RecoverabilityMatcher {
    patterns: RegexSet,
}

impl RecoverabilityMatcher {
    pub const DEFAULT_PATTERNS: [&'static str; 6] = [
        "rate limit",
        "timeout",
        "econnreset",
        "etimedout",
        "network",
        "temporary",
    ];

    pub fn with_patterns(patterns: &[&str]) -> Result<Self, PipelineError> {
        let case_insensitive: Vec<String> =
            patterns.iter().map(|p| format!("(?i){p}")).collect();
        let patterns = RegexSet::new(&case_insensitive)
            .map_err(|e| PipelineError::Config(format!("invalid recoverability pattern: {e}")))?;
        Ok(Self { patterns })
    }

    pub fn is_recoverable(&self, message: &str) -> bool {
        self.patterns.is_match(message)
    }
}

impl Default for RecoverabilityMatcher {
    fn default() -> Self {
        Self::with_patterns(&Self::DEFAULT_PATTERNS)
            .unwrap_or_else(|_| unreachable!("default patterns are valid"))
    }
}

/// Runs arbitrary fallible async operations so that failures are recorded,
/// classified, and contained.
pub struct ErrorHandler {
    policy: RetryPolicy,
    matcher: RecoverabilityMatcher,
    log: Mutex<Vec<GenerationError>>,
}

impl ErrorHandler {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_matcher(policy, RecoverabilityMatcher::default())
    }

    pub fn with_matcher(policy: RetryPolicy, matcher: RecoverabilityMatcher) -> Self {
        Self {
            policy,
            matcher,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn is_recoverable(&self, message: &str) -> bool {
        self.matcher.is_recoverable(message)
    }

    /// Run `op` once. On failure the error is wrapped, classified, recorded,
    /// and returned — never thrown past the unit boundary.
    pub async fn execute_with_isolation<T>(
        &self,
        op: impl Future<Output = Result<T, PipelineError>>,
        ctx: &ErrorContext,
    ) -> UnitOutcome<T> {
        match op.await {
            Ok(value) => Ok(value),
            Err(err) => Err(self.record(err, ctx)),
        }
    }

    /// Run `make_op` up to `max_attempts` times with exponential backoff
    /// between attempts (`base_delay * 2^attempt`, no jitter, kept
    /// deterministic). Success short-circuits. On exhaustion only the last
    /// error is recorded; earlier attempt errors are discarded, so the error
    /// count observed by callers stays one per exhausted chain.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        mut make_op: F,
        ctx: &ErrorContext,
    ) -> UnitOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut last_error = None;
        for attempt in 0..self.policy.max_attempts {
            match make_op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    debug!(
                        stage = %ctx.stage,
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        error = %err,
                        "attempt failed"
                    );
                    last_error = Some(err);
                    if attempt + 1 < self.policy.max_attempts {
                        let delay = self.policy.base_delay * 2u32.saturating_pow(attempt);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        let err = last_error.unwrap_or_else(|| {
            PipelineError::Generation("retry loop ran zero attempts".to_string())
        });
        Err(self.record(err, ctx))
    }

    /// Run every entry concurrently, each isolated independently. The output
    /// preserves input order even though entries complete out of order; a
    /// failure in one entry never affects the others.
    pub async fn execute_all_with_isolation<T, Fut>(
        &self,
        ops: Vec<(Fut, ErrorContext)>,
    ) -> Vec<UnitOutcome<T>>
    where
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        futures::future::join_all(
            ops.into_iter()
                .map(|(op, ctx)| async move { self.execute_with_isolation(op, &ctx).await }),
        )
        .await
    }

    pub fn errors(&self) -> Vec<GenerationError> {
        self.log.lock().clone()
    }

    pub fn errors_for_file(&self, path: &str) -> Vec<GenerationError> {
        self.log
            .lock()
            .iter()
            .filter(|e| e.file_path.as_deref() == Some(path))
            .cloned()
            .collect()
    }

    pub fn error_count_by_stage(&self) -> HashMap<Stage, usize> {
        let mut counts = HashMap::new();
        for err in self.log.lock().iter() {
            *counts.entry(err.stage).or_insert(0) += 1;
        }
        counts
    }

    /// Human-readable one-line summary of the error log.
    pub fn error_summary(&self) -> String {
        let log = self.log.lock();
        if log.is_empty() {
            return "no errors recorded".to_string();
        }
        let mut counts: Vec<(Stage, usize)> = {
            let mut map = HashMap::new();
            for err in log.iter() {
                *map.entry(err.stage).or_insert(0usize) += 1;
            }
            map.into_iter().collect()
        };
        counts.sort_by_key(|(stage, _)| stage.as_str());
        let breakdown: Vec<String> = counts
            .iter()
            .map(|(stage, count)| format!("{stage}: {count}"))
            .collect();
        format!("{} error(s) recorded ({})", log.len(), breakdown.join(", "))
    }

    pub fn has_errors(&self) -> bool {
        !self.log.lock().is_empty()
    }

    pub fn clear_errors(&self) {
        self.log.lock().clear();
    }

    fn record(&self, err: PipelineError, ctx: &ErrorContext) -> GenerationError {
        let message = err.to_string();
        let recoverable = self.matcher.is_recoverable(&message);
        let entry = GenerationError::new(ctx.file_path.clone(), ctx.stage, message, recoverable);
        warn!(
            stage = %entry.stage,
            file_path = entry.file_path.as_deref().unwrap_or("-"),
            recoverable = entry.recoverable,
            error = %entry.message,
            "generation error recorded"
        );
        self.log.lock().push(entry.clone());
        entry
    }
}
