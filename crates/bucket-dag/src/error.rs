//! [`ErrorValue`]: the in-band failure wrapper, and [`FatalError`]: the
//! small closed set of failures allowed to escape the executor.

use std::sync::Arc;

use bucket_runtime::StepId;

/// An in-band wrapper around a runtime failure, tagged with the step it
/// originated at.
///
/// Its fields are private, so the only way to produce one is [`ErrorValue::new`].
/// Combined with columns being `Vec<Result<CellValue, ErrorValue>>`, the
/// `Result` discriminant is the single, forgery-resistant test for "is
/// this cell an error" — there is no structural mimicry possible, because
/// ordinary column data can never occupy the `Err` arm except by wrapping
/// a real `anyhow::Error` through this type.
#[derive(Debug, Clone)]
pub struct ErrorValue {
    original: Arc<anyhow::Error>,
    origin: StepId,
}

impl ErrorValue {
    /// Wrap `original` as having originated at `origin`. Steps call this
    /// directly to fail individual rows; the scheduler calls it to tag
    /// rejected futures and promote whole-step panics.
    pub fn new(original: anyhow::Error, origin: StepId) -> Self {
        Self {
            original: Arc::new(original),
            origin,
        }
    }

    /// The original failure, preserved for a resolver boundary to unwrap.
    pub fn original(&self) -> &anyhow::Error {
        &self.original
    }

    /// The step at which this error originated.
    pub fn origin(&self) -> StepId {
        self.origin
    }
}

impl std::fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error at step {}: {}", self.origin, self.original)
    }
}

/// `true` iff the cell is an error. A named predicate over the `Result`
/// discriminant, kept so call sites read as an `is_error` check rather
/// than reaching for `.is_err()` directly.
pub fn is_error<T>(cell: &Result<T, ErrorValue>) -> bool {
    cell.is_err()
}

/// The only failures allowed to escape `execute_bucket`: programming
/// errors in a step or in the plan, never row- or step-level data
/// failures (those are always recovered into `ErrorValue`s instead).
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    /// A step returned a column whose length didn't match the bucket size.
    #[error("step {step_id} returned a column of length {actual}, expected {expected}")]
    ShapeViolation {
        step_id: StepId,
        expected: usize,
        actual: usize,
    },

    /// A step marked `is_sync_and_safe` did not return synchronously
    /// (it returned `ExecOutcome::Future` instead of completing at once).
    #[error("step {step_id} violated its is_sync_and_safe contract: {reason}")]
    SyncContractViolation { step_id: StepId, reason: String },

    /// The error-aware invoker's merge-back did not fully consume the
    /// step's reduced output column (or over-consumed it).
    #[error(
        "step {step_id} error-aware merge mismatch: expected {expected} surviving rows, step returned {actual}"
    )]
    MergeMismatch {
        step_id: StepId,
        expected: usize,
        actual: usize,
    },

    /// `root` appeared as a child layer plan's reason.
    #[error("layer plan {layer_id} has a child tagged `root`; root cannot be a child")]
    RootAsChild { layer_id: String },

    /// A child layer plan carried a `reason` this executor does not
    /// recognize.
    #[error("layer plan {layer_id} has a child with unrecognized reason `{reason}`")]
    UnknownChildReason { layer_id: String, reason: String },
}
