//! The scheduler: the dispatch loop that drives a `Bucket` to completion
//! against a `LayerPlan`.

mod handoff;
mod invoker;

use std::collections::HashSet;

use bucket_runtime::{now_ms, DiagnosticEvent, RequestContext, StepId};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tracing::Instrument;

use crate::bucket::Bucket;
use crate::error::FatalError;
use crate::plan::{is_ready, LayerPlan};
use crate::step::StepExtra;
use crate::value::Column;

type StepFuture<'a> =
    std::pin::Pin<Box<dyn std::future::Future<Output = (StepId, Result<Column, FatalError>)> + 'a>>;

/// Run `plan` against `bucket` to completion: repeatedly dispatch every
/// step whose dependencies are all published, wait for at least one to
/// finish, publish its column, and repeat until nothing is left ready.
///
/// Because a plan is acyclic and every step has either zero dependencies
/// (immediately ready) or dependencies that are themselves steps in the
/// plan, this loop always terminates with every step published — unless a
/// `FatalError` aborts it first. On success, `bucket.is_complete()` is
/// `true` and its declared children have been dispatched.
pub async fn execute_bucket(
    plan: &LayerPlan,
    bucket: &mut Bucket,
    request: &RequestContext,
) -> Result<(), FatalError> {
    let span = tracing::debug_span!(
        "bucket_execution",
        size = bucket.size(),
        step_count = plan.steps().len(),
    );
    run(plan, bucket, request).instrument(span).await
}

async fn run(
    plan: &LayerPlan,
    bucket: &mut Bucket,
    request: &RequestContext,
) -> Result<(), FatalError> {
    let mut dispatched: HashSet<StepId> = HashSet::new();
    let mut pending: FuturesUnordered<StepFuture<'_>> = FuturesUnordered::new();

    loop {
        let newly_ready: Vec<StepId> = plan
            .steps()
            .iter()
            .copied()
            .filter(|id| !dispatched.contains(id) && is_ready(plan, *id, bucket))
            .collect();

        for step_id in newly_ready {
            dispatched.insert(step_id);
            let deps = gather_deps(plan, bucket, step_id);
            let step = plan
                .step(step_id)
                .expect("step_id came from plan.steps(), must resolve");
            let size = bucket.size();
            let has_errors = bucket.has_errors();

            tracing::debug!(%step_id, "dispatching step");
            request.event_emitter().emit(DiagnosticEvent::DispatchStarted {
                step_id,
                timestamp_ms: now_ms(),
            });

            let fut: StepFuture<'_> = Box::pin(async move {
                let extra = StepExtra {
                    step_id,
                    size,
                    request,
                };
                let column = invoker::invoke(step, &deps, &extra, has_errors).await;
                (step_id, column)
            });
            pending.push(fut);
        }

        let Some((step_id, result)) = pending.next().await else {
            break;
        };

        let column = result.inspect_err(|err| {
            tracing::error!(%step_id, %err, "fatal error completing step");
        })?;
        let had_errors = column.iter().any(Result::is_err);
        tracing::debug!(%step_id, had_errors, "dispatch completed");
        request.event_emitter().emit(DiagnosticEvent::DispatchCompleted {
            step_id,
            timestamp_ms: now_ms(),
            had_errors,
        });
        bucket.publish(step_id, column);
    }

    bucket.mark_complete();
    request.event_emitter().emit(DiagnosticEvent::BucketComplete {
        timestamp_ms: now_ms(),
        size: bucket.size(),
    });
    handoff::handle_children(plan.id(), &plan.children, request)?;
    Ok(())
}

fn gather_deps(plan: &LayerPlan, bucket: &Bucket, step_id: StepId) -> Vec<Column> {
    let step = plan.step(step_id).expect("valid step id");
    if step.dependencies().is_empty() {
        vec![bucket.no_deps_list()]
    } else {
        step.dependencies()
            .iter()
            .map(|dep| {
                bucket
                    .column(*dep)
                    .cloned()
                    .expect("dependency published before step becomes ready")
            })
            .collect()
    }
}
