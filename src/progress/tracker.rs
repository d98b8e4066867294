//! Throttled progress tracking for one active stage at a time.
//!
//! The first and last event of every stage are always delivered; between
//! them, emission is suppressed unless the configured interval has elapsed
//! since the previous delivery. Subscribers therefore observe every stage
//! boundary regardless of how fast the pipeline bursts updates.

use crate::progress::event::ProgressEvent;
use crate::types::Stage;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default minimum interval between throttled emissions.
pub const DEFAULT_EMIT_INTERVAL: Duration = Duration::from_millis(100);

/// Handle returned by `on_progress`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(u64);

type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

struct TrackerState {
    stage: Option<Stage>,
    current: usize,
    total: usize,
    stage_message: String,
    last_emit: Option<Instant>,
}

impl TrackerState {
    fn idle() -> Self {
        Self {
            stage: None,
            current: 0,
            total: 0,
            stage_message: String::new(),
            last_emit: None,
        }
    }
}

/// Emits a lazy, throttled sequence of progress events for one active stage.
pub struct ProgressTracker {
    state: Mutex<TrackerState>,
    subscribers: Mutex<Vec<(SubscriberId, ProgressCallback)>>,
    next_subscriber: AtomicU64,
    min_emit_interval: Duration,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_EMIT_INTERVAL)
    }

    pub fn with_interval(min_emit_interval: Duration) -> Self {
        Self {
            state: Mutex::new(TrackerState::idle()),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber: AtomicU64::new(1),
            min_emit_interval,
        }
    }

    /// Register a subscriber. Multiple independent subscribers may be
    /// attached; removing one never affects the others' delivery.
    pub fn on_progress<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(callback)));
        id
    }

    pub fn off_progress(&self, id: SubscriberId) {
        self.subscribers.lock().retain(|(sid, _)| *sid != id);
    }

    /// Begin a stage. Resets current to 0 and emits unconditionally.
    pub fn start_stage(&self, stage: Stage, total: usize, message: impl Into<String>) {
        let message = message.into();
        debug!(stage = %stage, total, "stage started");
        let event = {
            let mut state = self.state.lock();
            state.stage = Some(stage);
            state.current = 0;
            state.total = total;
            state.stage_message = message.clone();
            state.last_emit = Some(Instant::now());
            ProgressEvent::new(stage, 0, total, message)
        };
        self.deliver(&event);
    }

    /// Set the current item count. Emits unless throttled.
    pub fn update_progress(&self, current: usize, message: Option<&str>) {
        self.advance(|state| state.current = current, message);
    }

    /// Bump the current item count by one. Emits unless throttled.
    pub fn increment_progress(&self, message: Option<&str>) {
        self.advance(|state| state.current += 1, message);
    }

    /// Finish the active stage. Sets current to total and emits
    /// unconditionally.
    pub fn complete_stage(&self, message: Option<&str>) {
        let event = {
            let mut state = self.state.lock();
            let Some(stage) = state.stage else {
                return;
            };
            state.current = state.total;
            state.last_emit = Some(Instant::now());
            let text = message.unwrap_or(&state.stage_message).to_string();
            ProgressEvent::new(stage, state.current, state.total, text)
        };
        debug!(stage = %event.stage, total = event.total, "stage completed");
        self.deliver(&event);
    }

    /// Rounded completion percentage of the active stage; 0 when total is 0.
    pub fn progress_percentage(&self) -> u32 {
        let state = self.state.lock();
        if state.total == 0 {
            return 0;
        }
        ((state.current as f64 / state.total as f64) * 100.0).round() as u32
    }

    /// Return the tracker to its pre-`start_stage` state. Subscribers stay
    /// registered.
    pub fn reset(&self) {
        *self.state.lock() = TrackerState::idle();
    }

    fn advance<F: FnOnce(&mut TrackerState)>(&self, apply: F, message: Option<&str>) {
        let event = {
            let mut state = self.state.lock();
            let Some(stage) = state.stage else {
                return;
            };
            apply(&mut state);
            let boundary = state.current == 0 || state.current == state.total;
            let elapsed_enough = state
                .last_emit
                .map(|at| at.elapsed() >= self.min_emit_interval)
                .unwrap_or(true);
            if !boundary && !elapsed_enough {
                return;
            }
            state.last_emit = Some(Instant::now());
            let text = message.unwrap_or(&state.stage_message).to_string();
            ProgressEvent::new(stage, state.current, state.total, text)
        };
        self.deliver(&event);
    }

    fn deliver(&self, event: &ProgressEvent) {
        // Clone the callbacks out so a subscriber may re-enter the tracker
        // (e.g. unsubscribe itself) without deadlocking.
        let callbacks: Vec<ProgressCallback> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
