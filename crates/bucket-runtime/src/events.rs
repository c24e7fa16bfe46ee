//! Diagnostic event sink: a flat enum of things the scheduler observed,
//! fed to a sink the host controls.

use crate::id::StepId;

/// Milliseconds since the Unix epoch, for stamping [`DiagnosticEvent`]s.
/// Centralized here so every emission site shares one clock source.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Diagnostic events a bucket execution may emit. These are best-effort
/// observability, never part of the correctness contract: a host that
/// drops every event still gets a fully correct execution.
#[derive(Debug, Clone)]
pub enum DiagnosticEvent {
    /// A step's dependencies are all materialized and it has been handed
    /// to the scheduler's dispatch path.
    DispatchStarted { step_id: StepId, timestamp_ms: i64 },
    /// A step's column was published to the bucket store.
    DispatchCompleted {
        step_id: StepId,
        timestamp_ms: i64,
        had_errors: bool,
    },
    /// A step raised synchronously, or its future rejected, causing a
    /// whole-batch broadcast failure.
    StepErrored {
        step_id: StepId,
        timestamp_ms: i64,
        message: String,
    },
    /// All steps in the layer plan have published a column.
    BucketComplete { timestamp_ms: i64, size: usize },
    /// A child layer plan whose reason is out of this executor's scope
    /// (subroutine/subscription/defer/stream) was encountered and skipped.
    ChildHandoffSkipped { reason: String },
}

/// Sink for [`DiagnosticEvent`]s. Implementations must not block the
/// scheduler for long — emission happens inline on the hot path.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: DiagnosticEvent);
}

/// An `EventEmitter` that discards everything. The default for requests
/// that don't care about diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventEmitter;

impl EventEmitter for NullEventEmitter {
    fn emit(&self, _event: DiagnosticEvent) {}
}

/// An `EventEmitter` that logs each event at `debug` (or `warn` for
/// `StepErrored`) via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventEmitter;

impl EventEmitter for TracingEventEmitter {
    fn emit(&self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::DispatchStarted { step_id, .. } => {
                tracing::debug!(%step_id, "dispatch started");
            }
            DiagnosticEvent::DispatchCompleted { step_id, had_errors, .. } => {
                tracing::debug!(%step_id, had_errors, "dispatch completed");
            }
            DiagnosticEvent::StepErrored { step_id, message, .. } => {
                tracing::warn!(%step_id, message, "step errored");
            }
            DiagnosticEvent::BucketComplete { size, .. } => {
                tracing::debug!(size, "bucket complete");
            }
            DiagnosticEvent::ChildHandoffSkipped { reason } => {
                tracing::debug!(reason, "child hand-off skipped");
            }
        }
    }
}
