//! Progress-callback trait for per-unit pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::VectorizeConfigBuilder::progress_callback`] to receive
//! real-time events as each stage works through its units (documents for
//! conversion and extraction, paragraphs for vectorization).
//!
//! Reporting is strictly observational: no callback return value can alter
//! control flow or results.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a log sink, or a metrics
//! counter without the library knowing anything about how the host
//! application communicates. The trait is `Send + Sync` so it works when
//! units are processed concurrently by the worker pool.

use std::sync::Arc;

use crate::output::Stage;

/// Called by the pipeline as each stage processes its units.
///
/// Implementations must be `Send + Sync` (units may run concurrently when
/// `num_threads > 1`). All methods have default no-op implementations so
/// callers only override what they care about.
///
/// # Thread safety
///
/// With `num_threads > 1`, `on_unit_start`, `on_unit_complete`, and
/// `on_unit_error` may be called concurrently from different worker
/// threads. Implementations must protect shared mutable state with
/// appropriate synchronisation primitives (e.g. `Mutex`, `AtomicUsize`).
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once when a stage begins, before any unit is dispatched.
    fn on_stage_start(&self, stage: Stage, total_units: usize) {
        let _ = (stage, total_units);
    }

    /// Called just before a unit is processed.
    ///
    /// # Arguments
    /// * `done`  — units finished so far (success or failure)
    /// * `total` — units in this stage
    /// * `label` — human-readable unit label, e.g. `report.pdf` or
    ///   `report.pdf ¶12`
    fn on_unit_start(&self, stage: Stage, done: usize, total: usize, label: &str) {
        let _ = (stage, done, total, label);
    }

    /// Called when a unit completes successfully.
    fn on_unit_complete(&self, stage: Stage, done: usize, total: usize, label: &str) {
        let _ = (stage, done, total, label);
    }

    /// Called when a unit fails.
    ///
    /// In strict mode this is the last event before the run aborts; in
    /// tolerant mode the stage continues with the next unit.
    fn on_unit_error(&self, stage: Stage, done: usize, total: usize, label: &str, error: &str) {
        let _ = (stage, done, total, label, error);
    }

    /// Called once after every unit of a stage has been attempted.
    ///
    /// # Arguments
    /// * `total`    — units in this stage
    /// * `failures` — units that failed (always 0 in strict mode, which
    ///   aborts on the first failure)
    fn on_stage_complete(&self, stage: Stage, total: usize, failures: usize) {
        let _ = (stage, total, failures);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::VectorizeConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
