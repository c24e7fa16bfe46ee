//! Dependency-driven bucket executor.
//!
//! A [`LayerPlan`] is a static DAG of [`Step`]s. A [`Bucket`] is a batch of
//! rows executed against one; [`execute_bucket`] drives it to completion,
//! dispatching each step as soon as its dependencies are published,
//! recovering step- and row-level failures in-band as [`ErrorValue`]s, and
//! handing off declared child plans once the bucket is done.

mod bucket;
mod error;
mod plan;
mod scheduler;
mod step;
mod value;

pub use bucket::Bucket;
pub use error::{is_error, ErrorValue, FatalError};
pub use plan::{ChildLayerPlan, ChildReason, LayerPlan, PlanError};
pub use scheduler::execute_bucket;
pub use step::{Step, StepExtra};
pub use value::{Cell, CellValue, Column, ExecOutcome, RawColumn};
