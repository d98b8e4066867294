mod cache_reuse;
mod pipeline_resilience;
mod progress_observability;
pub mod support;
