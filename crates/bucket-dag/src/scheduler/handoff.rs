//! Child-layer hand-off: once a bucket completes, its declared children
//! are dispatched according to their `reason`.

use bucket_runtime::{DiagnosticEvent, RequestContext};

use crate::error::FatalError;
use crate::plan::{ChildLayerPlan, ChildReason};

/// Dispatch `children` by their reason tag.
///
/// `root` can never legally appear as a child's reason (a child is by
/// definition not the root of its own execution), and any reason this
/// executor doesn't recognize is a planner bug — both are fatal. The
/// remaining reasons name phases this executor doesn't itself fan out
/// into new buckets for (that's the surrounding query-planning runtime's
/// job, out of this crate's scope); they are acknowledged with a
/// diagnostic event and otherwise skipped.
pub fn handle_children(
    layer_id: &str,
    children: &[ChildLayerPlan],
    request: &RequestContext,
) -> Result<(), FatalError> {
    for child in children {
        match &child.reason {
            ChildReason::Root => {
                tracing::error!(layer_id, "root layer plan appeared as a child");
                return Err(FatalError::RootAsChild {
                    layer_id: layer_id.to_string(),
                });
            }
            ChildReason::Unknown(reason) => {
                tracing::error!(layer_id, reason, "child layer plan has unrecognized reason");
                return Err(FatalError::UnknownChildReason {
                    layer_id: layer_id.to_string(),
                    reason: reason.clone(),
                });
            }
            ChildReason::ListItem
            | ChildReason::MutationField
            | ChildReason::Polymorphic
            | ChildReason::Subroutine
            | ChildReason::Subscription
            | ChildReason::Defer
            | ChildReason::Stream => {
                request.event_emitter().emit(DiagnosticEvent::ChildHandoffSkipped {
                    reason: format!("{:?}", child.reason),
                });
            }
        }
    }
    Ok(())
}
