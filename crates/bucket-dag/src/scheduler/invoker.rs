//! The error-aware invoker: when the bucket already has errors, filters
//! already-errored rows out of a step's inputs before calling it and
//! merges its output back into row position; otherwise invokes the step
//! directly, matching spec's "if bucket.hasErrors, invoke the error-aware
//! invoker; else invoke directly" dispatch rule.

use bucket_runtime::{now_ms, DiagnosticEvent};
use bucket_runtime::StepId;
use futures::FutureExt;

use crate::error::{ErrorValue, FatalError};
use crate::step::{Step, StepExtra};
use crate::value::{Cell, Column, ExecOutcome, RawColumn};

/// Run `step` against `deps`. When `bucket_has_errors` is `false`, `step` is
/// invoked directly and its output is validated against the bucket's row
/// count. When `true`, rows that already carry a dependency error are
/// filtered out before invocation and the step's output is merged back
/// positionally: already-errored rows carry forward the *first* dependency
/// error encountered for that row (in dependency order), and surviving rows
/// carry whatever `step` produced for them.
pub async fn invoke(
    step: &dyn Step,
    deps: &[Column],
    extra: &StepExtra<'_>,
    bucket_has_errors: bool,
) -> Result<Column, FatalError> {
    if !bucket_has_errors {
        return invoke_direct(step, deps, extra).await;
    }
    invoke_filtered(step, deps, extra).await
}

/// The non-error-aware path: no rows to filter, so `step`'s raw output must
/// already be exactly `bucket.size` long.
async fn invoke_direct(
    step: &dyn Step,
    deps: &[Column],
    extra: &StepExtra<'_>,
) -> Result<Column, FatalError> {
    let step_id = step.id();
    let expected = deps.first().map(Column::len).unwrap_or(extra.size);

    let raw = run_step(step, deps, extra).await?;
    if raw.len() != expected {
        tracing::error!(%step_id, expected, actual = raw.len(), "step returned mis-sized column");
        return Err(FatalError::ShapeViolation {
            step_id,
            expected,
            actual: raw.len(),
        });
    }

    Ok(reduce(raw, step_id, extra).await)
}

/// The error-aware path: scan dependency columns for the first error per
/// row, filter those rows out, invoke `step` on the reduced batch, and
/// merge its output back by position.
async fn invoke_filtered(
    step: &dyn Step,
    deps: &[Column],
    extra: &StepExtra<'_>,
) -> Result<Column, FatalError> {
    let step_id = step.id();
    let size = deps.first().map(Column::len).unwrap_or(extra.size);

    let mut carried_errors: Vec<Option<ErrorValue>> = vec![None; size];
    for column in deps {
        for (row, cell) in column.iter().enumerate() {
            if carried_errors[row].is_none()
                && let Err(e) = cell
            {
                carried_errors[row] = Some(e.clone());
            }
        }
    }

    let surviving: Vec<usize> = (0..size).filter(|r| carried_errors[*r].is_none()).collect();

    let reduced_deps: Vec<Column> = deps
        .iter()
        .map(|column| {
            surviving
                .iter()
                .map(|&r| column[r].clone())
                .collect::<Column>()
        })
        .collect();

    let raw = run_step(step, &reduced_deps, extra).await?;

    if raw.len() != surviving.len() {
        tracing::error!(
            %step_id,
            expected = surviving.len(),
            actual = raw.len(),
            "step's error-aware merge-back mismatched"
        );
        return Err(FatalError::MergeMismatch {
            step_id,
            expected: surviving.len(),
            actual: raw.len(),
        });
    }

    let reduced_column = reduce(raw, step_id, extra).await;

    let mut output: Column = Vec::with_capacity(size);
    let mut reduced_iter = reduced_column.into_iter();
    for carried in carried_errors {
        match carried {
            Some(err) => output.push(Err(err)),
            None => {
                let cell = reduced_iter
                    .next()
                    .expect("surviving row count matches reduced output length, checked above");
                output.push(cell);
            }
        }
    }

    Ok(output)
}

/// Call `step.execute`, enforcing the `is_sync_and_safe` contract and
/// catching panics so that a buggy step fails its own column rather than
/// the whole executor, unless the failure is a plan/contract violation.
async fn run_step(
    step: &dyn Step,
    deps: &[Column],
    extra: &StepExtra<'_>,
) -> Result<RawColumn, FatalError> {
    let step_id = step.id();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        step.execute(deps, extra)
    }));

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(panic) => return Ok(catastrophic_column(step_id, deps, panic, extra)),
    };

    match outcome {
        ExecOutcome::Ready(raw) => Ok(raw),
        ExecOutcome::Future(fut) => {
            if step.is_sync_and_safe() {
                tracing::error!(
                    %step_id,
                    "step returned a future despite claiming is_sync_and_safe"
                );
                return Err(FatalError::SyncContractViolation {
                    step_id,
                    reason: "returned ExecOutcome::Future despite is_sync_and_safe".to_string(),
                });
            }
            match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                Ok(raw) => Ok(raw),
                Err(panic) => Ok(catastrophic_column(step_id, deps, panic, extra)),
            }
        }
    }
}

/// Resolve a raw column's mixed `Value`/`Error`/`Future` cells into a
/// materialized `Column`, tagging rejected futures with `step_id` and
/// reporting each as a catastrophic, whole-row step failure.
async fn reduce(raw: RawColumn, step_id: StepId, extra: &StepExtra<'_>) -> Column {
    let mut out = Vec::with_capacity(raw.len());
    for cell in raw {
        out.push(match cell {
            Cell::Value(v) => Ok(v),
            Cell::Error(e) => Err(e),
            Cell::Future(fut) => match fut.await {
                Ok(v) => Ok(v),
                Err(e) => {
                    report_step_failure(step_id, &e, extra);
                    Err(ErrorValue::new(e, step_id))
                }
            },
        });
    }
    out
}

/// Broadcast a step panic across every row of its dependency-shaped batch
/// as the same `ErrorValue`, and report it as a catastrophic step failure.
fn catastrophic_column(
    step_id: StepId,
    deps: &[Column],
    panic: Box<dyn std::any::Any + Send>,
    extra: &StepExtra<'_>,
) -> RawColumn {
    let msg = panic_message(&panic);
    let size = deps.first().map(Column::len).unwrap_or(0);
    let error = anyhow::anyhow!("step panicked: {msg}");
    report_step_failure(step_id, &error, extra);
    let err = ErrorValue::new(error, step_id);
    (0..size).map(|_| Cell::Error(err.clone())).collect()
}

/// Log and emit the catastrophic-failure diagnostic for a step that raised
/// synchronously or whose future rejected wholesale.
fn report_step_failure(step_id: StepId, error: &anyhow::Error, extra: &StepExtra<'_>) {
    tracing::warn!(%step_id, %error, "step failed catastrophically");
    extra.request.event_emitter().emit(DiagnosticEvent::StepErrored {
        step_id,
        timestamp_ms: now_ms(),
        message: error.to_string(),
    });
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
