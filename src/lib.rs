//! Relic: resilient artifact generation for AI-assisted legacy-code
//! analysis.
//!
//! The crate is the orchestration core shared by the documentation and
//! test-suite synthesizers: per-unit failure isolation, retry with
//! exponential backoff, recoverable/non-recoverable error classification,
//! content-aware caching, throttled progress reporting, degrade-to-fallback
//! generation, and best-effort partial results. Prompt construction,
//! source parsing, and provider transport plug in behind the
//! `GenerationBackend` and `ArtifactValidator` seams.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod isolation;
pub mod logging;
pub mod partial;
pub mod pipeline;
pub mod progress;
pub mod synthesis;
pub mod types;
pub mod validation;
