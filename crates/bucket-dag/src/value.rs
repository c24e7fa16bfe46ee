//! Column and cell types.

use futures::future::LocalBoxFuture;

use crate::error::ErrorValue;

/// A leaf value flowing through the dataflow. Dynamically typed, since a
/// step's payload and its cell values share the same representation.
pub type CellValue = serde_json::Value;

/// A fully materialized column: one entry per row, already resolved to
/// either a value or an `ErrorValue`. This is what `Bucket::store` holds
/// and what a step's `deps` slice is built from.
pub type Column = Vec<Result<CellValue, ErrorValue>>;

/// One entry of a step's *raw*, not-yet-reduced output: a value, a
/// step-introduced error, or a pending computation.
pub enum Cell {
    /// An already-resolved value.
    Value(CellValue),
    /// A step-introduced error for this row (not via a dependency error —
    /// the step decided this particular row failed).
    Error(ErrorValue),
    /// A pending computation for this row. `Err` here is the row
    /// "rejecting"; the scheduler converts it to a fresh `ErrorValue`
    /// tagged with the step's id.
    Future(LocalBoxFuture<'static, anyhow::Result<CellValue>>),
}

impl Cell {
    pub fn value(v: impl Into<CellValue>) -> Self {
        Cell::Value(v.into())
    }

    pub fn future(
        fut: impl std::future::Future<Output = anyhow::Result<CellValue>> + 'static,
    ) -> Self {
        Cell::Future(Box::pin(fut))
    }
}

/// A step's raw, not-yet-reduced output column.
pub type RawColumn = Vec<Cell>;

/// What `Step::execute` hands back: either the whole output column
/// synchronously, or a future that resolves to one.
pub enum ExecOutcome {
    /// The step computed its whole output column synchronously.
    Ready(RawColumn),
    /// The step needs to do async work before its column is known.
    Future(LocalBoxFuture<'static, RawColumn>),
}

impl ExecOutcome {
    pub fn ready(column: RawColumn) -> Self {
        ExecOutcome::Ready(column)
    }

    pub fn future(fut: impl std::future::Future<Output = RawColumn> + 'static) -> Self {
        ExecOutcome::Future(Box::pin(fut))
    }
}
