//! `Bucket`: the mutable row-batch a `LayerPlan` executes against.

use std::collections::HashMap;

use bucket_runtime::StepId;

use crate::value::{CellValue, Column};

/// A batch of rows flowing through one `LayerPlan`. Holds every step's
/// materialized output column as it becomes available, plus the running
/// `has_errors`/`is_complete` flags tracked at bucket granularity (as
/// opposed to per-step or per-row state).
pub struct Bucket {
    size: usize,
    store: HashMap<StepId, Column>,
    has_errors: bool,
    is_complete: bool,
}

impl Bucket {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            store: HashMap::new(),
            has_errors: false,
            is_complete: false,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The placeholder column handed to a zero-dependency step: one
    /// `Ok(null)` per row. A real materialized column, not a sentinel,
    /// since its exact shape is a directly testable boundary property.
    pub fn no_deps_list(&self) -> Column {
        vec![Ok(CellValue::Null); self.size]
    }

    pub fn column(&self, step_id: StepId) -> Option<&Column> {
        self.store.get(&step_id)
    }

    /// Every published step's column, for reporting/inspection once a
    /// bucket has finished executing.
    pub fn columns(&self) -> impl Iterator<Item = (StepId, &Column)> {
        self.store.iter().map(|(id, col)| (*id, col))
    }

    pub fn is_published(&self, step_id: StepId) -> bool {
        self.store.contains_key(&step_id)
    }

    /// Record a step's completed column. Also folds in whether it
    /// contributed any new errors, updating the bucket-wide `has_errors`
    /// flag.
    pub fn publish(&mut self, step_id: StepId, column: Column) {
        if column.iter().any(Result::is_err) {
            self.has_errors = true;
        }
        self.store.insert(step_id, column);
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn mark_complete(&mut self) {
        self.is_complete = true;
    }
}
