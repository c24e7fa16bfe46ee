//! Request-scoped ambient context for the bucket executor.
//!
//! This crate mediates everything the scheduler needs from the outside
//! world that isn't the layer plan or the bucket itself: step identity,
//! per-step scratchpads that persist across a request, and a diagnostic
//! event sink. Nothing here knows about columns, steps, or scheduling —
//! that's `bucket-dag`.

mod context;
mod events;
mod id;

pub use context::{RequestContext, StepMeta};
pub use events::{now_ms, DiagnosticEvent, EventEmitter, NullEventEmitter, TracingEventEmitter};
pub use id::StepId;
