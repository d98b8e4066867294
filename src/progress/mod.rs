//! Progress observability for long-running generation jobs.

mod event;
mod tracker;

pub use event::ProgressEvent;
pub use tracker::{ProgressTracker, SubscriberId, DEFAULT_EMIT_INTERVAL};
