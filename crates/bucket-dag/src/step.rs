//! The step contract.

use bucket_runtime::{RequestContext, StepId};

use crate::value::{Column, ExecOutcome};

/// Extra context a step receives alongside its dependency columns:
/// `requestContext`'s per-step scratchpad and event emitter, plus the
/// bucket's row count (so zero-dependency steps know their output shape
/// without needing to inspect `noDepsList`'s contents).
pub struct StepExtra<'a> {
    pub step_id: StepId,
    pub size: usize,
    pub request: &'a RequestContext,
}

/// A unit of computation that produces one column from its dependency
/// columns. Modeled as a single trait method plus static flags:
/// `is_sync_and_safe` is a performance switch, never a correctness one.
pub trait Step: Send + Sync {
    /// Stable identity within the owning layer plan.
    fn id(&self) -> StepId;

    /// Dependency step ids in declared order — positions are significant,
    /// since the step sees `deps` in this order.
    fn dependencies(&self) -> &[StepId];

    /// When `true`, `execute` promises to always return
    /// `ExecOutcome::Ready(..)` — never `ExecOutcome::Future(..)` — letting
    /// the scheduler skip the async machinery for this step. It says
    /// nothing about whether individual rows succeed: a sync-and-safe step
    /// can still fail rows via `Cell::Error`. A conservative implementation
    /// may always return `false` and take the slow path; returning `true`
    /// and then handing back a `Future` is a programming error the
    /// scheduler treats as fatal.
    fn is_sync_and_safe(&self) -> bool {
        false
    }

    /// Given dependency columns in declared order (or a single
    /// `noDepsList`-shaped column when `dependencies()` is empty), produce
    /// this step's output.
    fn execute(&self, deps: &[Column], extra: &StepExtra<'_>) -> ExecOutcome;
}
