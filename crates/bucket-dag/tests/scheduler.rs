//! Scheduler-level tests exercising the bucket executor directly against
//! `Step` implementations, independent of any declarative config layer.

use std::sync::Arc;

use std::sync::Mutex;

use bucket_dag::{
    Bucket, Cell, CellValue, Column, ErrorValue, ExecOutcome, LayerPlan, RawColumn, Step, StepExtra,
};
use bucket_runtime::{DiagnosticEvent, EventEmitter, NullEventEmitter, RequestContext, StepId};

struct Const {
    id: StepId,
    value: CellValue,
}

impl Step for Const {
    fn id(&self) -> StepId {
        self.id
    }
    fn dependencies(&self) -> &[StepId] {
        &[]
    }
    fn is_sync_and_safe(&self) -> bool {
        true
    }
    fn execute(&self, _deps: &[Column], extra: &StepExtra<'_>) -> ExecOutcome {
        ExecOutcome::ready((0..extra.size).map(|_| Cell::value(self.value.clone())).collect())
    }
}

struct Increment {
    id: StepId,
    deps: Vec<StepId>,
}

impl Step for Increment {
    fn id(&self) -> StepId {
        self.id
    }
    fn dependencies(&self) -> &[StepId] {
        &self.deps
    }
    fn is_sync_and_safe(&self) -> bool {
        true
    }
    fn execute(&self, deps: &[Column], _extra: &StepExtra<'_>) -> ExecOutcome {
        let raw: RawColumn = deps[0]
            .iter()
            .map(|cell| match cell {
                Ok(v) => Cell::value(serde_json::json!(v.as_f64().unwrap() + 1.0)),
                Err(e) => Cell::Error(e.clone()),
            })
            .collect();
        ExecOutcome::ready(raw)
    }
}

struct AsyncIncrement {
    id: StepId,
    deps: Vec<StepId>,
}

impl Step for AsyncIncrement {
    fn id(&self) -> StepId {
        self.id
    }
    fn dependencies(&self) -> &[StepId] {
        &self.deps
    }
    fn execute(&self, deps: &[Column], _extra: &StepExtra<'_>) -> ExecOutcome {
        let input = deps[0].clone();
        ExecOutcome::future(async move {
            let mut out = RawColumn::with_capacity(input.len());
            for cell in input {
                out.push(match cell {
                    Err(e) => Cell::Error(e),
                    Ok(v) => Cell::future(async move { Ok(serde_json::json!(v.as_f64().unwrap() + 1.0)) }),
                });
            }
            out
        })
    }
}

struct Sum {
    id: StepId,
    deps: Vec<StepId>,
}

impl Step for Sum {
    fn id(&self) -> StepId {
        self.id
    }
    fn dependencies(&self) -> &[StepId] {
        &self.deps
    }
    fn is_sync_and_safe(&self) -> bool {
        true
    }
    fn execute(&self, deps: &[Column], extra: &StepExtra<'_>) -> ExecOutcome {
        let size = deps.first().map(Column::len).unwrap_or(extra.size);
        let raw: RawColumn = (0..size)
            .map(|row| {
                let mut total = 0.0;
                for col in deps {
                    match &col[row] {
                        Ok(v) => total += v.as_f64().unwrap(),
                        Err(e) => return Cell::Error(e.clone()),
                    }
                }
                Cell::value(serde_json::json!(total))
            })
            .collect();
        ExecOutcome::ready(raw)
    }
}

struct AlwaysFails {
    id: StepId,
}

impl Step for AlwaysFails {
    fn id(&self) -> StepId {
        self.id
    }
    fn dependencies(&self) -> &[StepId] {
        &[]
    }
    fn execute(&self, _deps: &[Column], _extra: &StepExtra<'_>) -> ExecOutcome {
        panic!("deliberate step panic");
    }
}

struct MisSized {
    id: StepId,
}

impl Step for MisSized {
    fn id(&self) -> StepId {
        self.id
    }
    fn dependencies(&self) -> &[StepId] {
        &[]
    }
    fn is_sync_and_safe(&self) -> bool {
        true
    }
    fn execute(&self, _deps: &[Column], extra: &StepExtra<'_>) -> ExecOutcome {
        // Deliberately wrong: one row fewer than the bucket's row count.
        ExecOutcome::ready((0..extra.size.saturating_sub(1)).map(|_| Cell::value(1)).collect())
    }
}

#[derive(Default)]
struct RecordingEventEmitter {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl EventEmitter for RecordingEventEmitter {
    fn emit(&self, event: DiagnosticEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn id(n: u32) -> StepId {
    StepId::from_index(n)
}

fn request() -> RequestContext {
    RequestContext::new(Arc::new(NullEventEmitter))
}

#[test]
fn linear_chain_no_errors() {
    let plan = LayerPlan::new(
        "linear",
        vec![
            Box::new(Const { id: id(0), value: serde_json::json!(1) }),
            Box::new(Increment { id: id(1), deps: vec![id(0)] }),
            Box::new(Increment { id: id(2), deps: vec![id(1)] }),
        ],
    )
    .unwrap();
    let mut bucket = Bucket::new(3);
    let request = request();
    futures::executor::block_on(bucket_dag::execute_bucket(&plan, &mut bucket, &request)).unwrap();
    assert!(!bucket.has_errors());
    assert!(bucket.is_complete());
    let col = bucket.column(id(2)).unwrap();
    for cell in col {
        assert_eq!(cell.as_ref().unwrap(), &serde_json::json!(3.0));
    }
}

#[test]
fn diamond_with_async_branch() {
    let plan = LayerPlan::new(
        "diamond",
        vec![
            Box::new(Const { id: id(0), value: serde_json::json!(10) }),
            Box::new(Increment { id: id(1), deps: vec![id(0)] }),
            Box::new(AsyncIncrement { id: id(2), deps: vec![id(0)] }),
            Box::new(Sum { id: id(3), deps: vec![id(1), id(2)] }),
        ],
    )
    .unwrap();
    let mut bucket = Bucket::new(2);
    let request = request();
    futures::executor::block_on(bucket_dag::execute_bucket(&plan, &mut bucket, &request)).unwrap();
    assert!(!bucket.has_errors());
    let col = bucket.column(id(3)).unwrap();
    for cell in col {
        assert_eq!(cell.as_ref().unwrap(), &serde_json::json!(22.0));
    }
}

#[test]
fn row_level_error_does_not_abort_other_rows() {
    struct FailOddRows {
        id: StepId,
        deps: Vec<StepId>,
    }
    impl Step for FailOddRows {
        fn id(&self) -> StepId {
            self.id
        }
        fn dependencies(&self) -> &[StepId] {
            &self.deps
        }
        fn execute(&self, deps: &[Column], _extra: &StepExtra<'_>) -> ExecOutcome {
            let step_id = self.id;
            let raw: RawColumn = deps[0]
                .iter()
                .enumerate()
                .map(|(row, cell)| match cell {
                    Err(e) => Cell::Error(e.clone()),
                    Ok(v) if row % 2 == 1 => {
                        Cell::Error(ErrorValue::new(anyhow::anyhow!("odd row {row}"), step_id))
                    }
                    Ok(v) => Cell::value(v.clone()),
                })
                .collect();
            ExecOutcome::ready(raw)
        }
    }

    let plan = LayerPlan::new(
        "row_errors",
        vec![
            Box::new(Const { id: id(0), value: serde_json::json!(5) }),
            Box::new(FailOddRows { id: id(1), deps: vec![id(0)] }),
            Box::new(Increment { id: id(2), deps: vec![id(1)] }),
        ],
    )
    .unwrap();
    let mut bucket = Bucket::new(4);
    let request = request();
    futures::executor::block_on(bucket_dag::execute_bucket(&plan, &mut bucket, &request)).unwrap();
    assert!(bucket.has_errors());
    let col = bucket.column(id(2)).unwrap();
    assert!(col[0].is_ok());
    assert!(col[1].is_err());
    assert!(col[2].is_ok());
    assert!(col[3].is_err());
}

#[test]
fn catastrophic_step_failure_is_recovered_in_band() {
    let plan = LayerPlan::new(
        "catastrophic",
        vec![
            Box::new(AlwaysFails { id: id(0) }),
            Box::new(Increment { id: id(1), deps: vec![id(0)] }),
        ],
    )
    .unwrap();
    let mut bucket = Bucket::new(3);
    let request = request();
    let result = futures::executor::block_on(bucket_dag::execute_bucket(&plan, &mut bucket, &request));
    assert!(result.is_ok(), "a panicking step must not abort the executor");
    assert!(bucket.has_errors());
    assert!(bucket.column(id(1)).unwrap().iter().all(Result::is_err));
}

#[test]
fn is_sync_and_safe_fast_path_runs_without_suspension() {
    let plan = LayerPlan::new(
        "sync_safe",
        vec![
            Box::new(Const { id: id(0), value: serde_json::json!(1) }),
            Box::new(Increment { id: id(1), deps: vec![id(0)] }),
        ],
    )
    .unwrap();
    let mut bucket = Bucket::new(1);
    let request = request();
    futures::executor::block_on(bucket_dag::execute_bucket(&plan, &mut bucket, &request)).unwrap();
    assert_eq!(bucket.column(id(1)).unwrap()[0].as_ref().unwrap(), &serde_json::json!(2.0));
}

#[test]
fn zero_size_bucket_completes_with_empty_columns() {
    let plan = LayerPlan::new(
        "empty",
        vec![
            Box::new(Const { id: id(0), value: serde_json::json!(1) }),
            Box::new(Increment { id: id(1), deps: vec![id(0)] }),
        ],
    )
    .unwrap();
    let mut bucket = Bucket::new(0);
    let request = request();
    futures::executor::block_on(bucket_dag::execute_bucket(&plan, &mut bucket, &request)).unwrap();
    assert!(bucket.is_complete());
    assert!(!bucket.has_errors());
    assert!(bucket.column(id(1)).unwrap().is_empty());
}

#[test]
fn zero_dependency_step_receives_no_deps_list() {
    struct ChecksNoDepsList {
        id: StepId,
    }
    impl Step for ChecksNoDepsList {
        fn id(&self) -> StepId {
            self.id
        }
        fn dependencies(&self) -> &[StepId] {
            &[]
        }
        fn execute(&self, deps: &[Column], extra: &StepExtra<'_>) -> ExecOutcome {
            assert_eq!(deps.len(), 1);
            assert_eq!(deps[0].len(), extra.size);
            assert!(deps[0].iter().all(|c| matches!(c, Ok(v) if v.is_null())));
            ExecOutcome::ready((0..extra.size).map(|_| Cell::value(serde_json::json!(true))).collect())
        }
    }

    let plan = LayerPlan::new("no_deps", vec![Box::new(ChecksNoDepsList { id: id(0) })]).unwrap();
    let mut bucket = Bucket::new(3);
    let request = request();
    futures::executor::block_on(bucket_dag::execute_bucket(&plan, &mut bucket, &request)).unwrap();
    assert!(bucket.column(id(0)).unwrap().iter().all(|c| c.as_ref().unwrap() == &serde_json::json!(true)));
}

#[test]
fn unknown_child_reason_is_fatal_plan_violation() {
    use bucket_dag::{ChildLayerPlan, ChildReason};

    let child = LayerPlan::new("child", vec![Box::new(Const { id: id(0), value: serde_json::json!(1) })]).unwrap();
    let plan = LayerPlan::new("parent", vec![Box::new(Const { id: id(0), value: serde_json::json!(1) })])
        .unwrap()
        .with_children(vec![ChildLayerPlan {
            reason: ChildReason::parse("bogus"),
            plan: child,
        }]);
    let mut bucket = Bucket::new(1);
    let request = request();
    let err = futures::executor::block_on(bucket_dag::execute_bucket(&plan, &mut bucket, &request)).unwrap_err();
    assert!(matches!(err, bucket_dag::FatalError::UnknownChildReason { .. }));
}

#[test]
fn mis_sized_column_is_a_fatal_shape_violation() {
    let plan = LayerPlan::new("mis_sized", vec![Box::new(MisSized { id: id(0) })]).unwrap();
    let mut bucket = Bucket::new(3);
    let request = request();
    let err = futures::executor::block_on(bucket_dag::execute_bucket(&plan, &mut bucket, &request)).unwrap_err();
    assert!(matches!(
        err,
        bucket_dag::FatalError::ShapeViolation { expected: 3, actual: 2, .. }
    ));
}

#[test]
fn catastrophic_step_failure_emits_step_errored_event() {
    let plan = LayerPlan::new(
        "catastrophic_event",
        vec![Box::new(AlwaysFails { id: id(0) })],
    )
    .unwrap();
    let mut bucket = Bucket::new(2);
    let emitter = Arc::new(RecordingEventEmitter::default());
    let request = RequestContext::new(emitter.clone());
    futures::executor::block_on(bucket_dag::execute_bucket(&plan, &mut bucket, &request)).unwrap();
    let events = emitter.events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(e, DiagnosticEvent::StepErrored { step_id, .. } if *step_id == id(0))));
}
