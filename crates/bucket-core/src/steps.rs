//! Example `Step` implementations, usable directly or as a reference for
//! writing real ones: a synchronous constant, a row-wise map, a row-wise
//! combine over several dependencies, a step that deliberately fails some
//! rows, and one that does its work behind a future.

use anyhow::{Context, Result};
use bucket_dag::{Cell, CellValue, Column, ErrorValue, ExecOutcome, RawColumn, Step, StepExtra};
use bucket_runtime::StepId;
use serde::Deserialize;

use crate::config::StepConfig;

/// Build a boxed `Step` from its declarative config.
pub fn build_step(cfg: &StepConfig) -> Result<Box<dyn Step>> {
    let id = StepId::from_index(cfg.id);
    let dependencies: Vec<StepId> = cfg.dependencies.iter().copied().map(StepId::from_index).collect();
    match &cfg.kind {
        crate::config::StepKind::Const => {
            #[derive(Deserialize)]
            struct Payload {
                value: serde_json::Value,
            }
            let p: Payload = serde_json::from_value(cfg.payload.clone())
                .with_context(|| format!("step {id} payload decode const"))?;
            Ok(Box::new(ConstStep {
                id,
                dependencies,
                value: p.value,
            }))
        }
        crate::config::StepKind::Map => {
            #[derive(Deserialize)]
            struct Payload {
                op: MapOp,
            }
            let p: Payload = serde_json::from_value(cfg.payload.clone())
                .with_context(|| format!("step {id} payload decode map"))?;
            Ok(Box::new(MapStep {
                id,
                dependencies,
                op: p.op,
            }))
        }
        crate::config::StepKind::Combine => {
            #[derive(Deserialize)]
            struct Payload {
                op: CombineOp,
            }
            let p: Payload = serde_json::from_value(cfg.payload.clone())
                .with_context(|| format!("step {id} payload decode combine"))?;
            Ok(Box::new(CombineStep {
                id,
                dependencies,
                op: p.op,
            }))
        }
        crate::config::StepKind::Failing => {
            #[derive(Deserialize)]
            struct Payload {
                message: String,
                #[serde(default)]
                rows: Option<Vec<usize>>,
            }
            let p: Payload = serde_json::from_value(cfg.payload.clone())
                .with_context(|| format!("step {id} payload decode failing"))?;
            Ok(Box::new(FailingStep {
                id,
                dependencies,
                message: p.message,
                rows: p.rows,
            }))
        }
        crate::config::StepKind::AsyncDouble => Ok(Box::new(AsyncDoubleStep { id, dependencies })),
    }
}

/// Ignores its dependency columns (typically empty) and produces the same
/// value in every row, synchronously.
struct ConstStep {
    id: StepId,
    dependencies: Vec<StepId>,
    value: CellValue,
}

impl Step for ConstStep {
    fn id(&self) -> StepId {
        self.id
    }

    fn dependencies(&self) -> &[StepId] {
        &self.dependencies
    }

    fn is_sync_and_safe(&self) -> bool {
        true
    }

    fn execute(&self, _deps: &[Column], extra: &StepExtra<'_>) -> ExecOutcome {
        ExecOutcome::ready((0..extra.size).map(|_| Cell::value(self.value.clone())).collect())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum MapOp {
    Double,
    Increment,
    ToUpper,
}

/// Applies a pure, row-wise transformation to its single dependency.
struct MapStep {
    id: StepId,
    dependencies: Vec<StepId>,
    op: MapOp,
}

impl Step for MapStep {
    fn id(&self) -> StepId {
        self.id
    }

    fn dependencies(&self) -> &[StepId] {
        &self.dependencies
    }

    fn is_sync_and_safe(&self) -> bool {
        true
    }

    fn execute(&self, deps: &[Column], _extra: &StepExtra<'_>) -> ExecOutcome {
        let input = &deps[0];
        let step_id = self.id;
        let raw: RawColumn = input
            .iter()
            .map(|cell| match cell {
                Err(e) => Cell::Error(e.clone()),
                Ok(v) => match apply_map(&self.op, v) {
                    Ok(v) => Cell::Value(v),
                    Err(msg) => Cell::Error(ErrorValue::new(anyhow::anyhow!(msg), step_id)),
                },
            })
            .collect();
        ExecOutcome::ready(raw)
    }
}

fn apply_map(op: &MapOp, v: &CellValue) -> std::result::Result<CellValue, String> {
    match op {
        MapOp::Double => v
            .as_f64()
            .map(|n| serde_json::json!(n * 2.0))
            .ok_or_else(|| format!("double: not a number: {v}")),
        MapOp::Increment => v
            .as_f64()
            .map(|n| serde_json::json!(n + 1.0))
            .ok_or_else(|| format!("increment: not a number: {v}")),
        MapOp::ToUpper => v
            .as_str()
            .map(|s| serde_json::json!(s.to_uppercase()))
            .ok_or_else(|| format!("to_upper: not a string: {v}")),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CombineOp {
    Sum,
    Concat,
}

/// Combines several dependency columns row-wise into one.
struct CombineStep {
    id: StepId,
    dependencies: Vec<StepId>,
    op: CombineOp,
}

impl Step for CombineStep {
    fn id(&self) -> StepId {
        self.id
    }

    fn dependencies(&self) -> &[StepId] {
        &self.dependencies
    }

    fn is_sync_and_safe(&self) -> bool {
        true
    }

    fn execute(&self, deps: &[Column], extra: &StepExtra<'_>) -> ExecOutcome {
        let size = deps.first().map(Column::len).unwrap_or(extra.size);
        let step_id = self.id;
        let raw: RawColumn = (0..size)
            .map(|row| {
                let mut values = Vec::with_capacity(deps.len());
                for column in deps {
                    match &column[row] {
                        Err(e) => return Cell::Error(e.clone()),
                        Ok(v) => values.push(v.clone()),
                    }
                }
                match combine(&self.op, &values) {
                    Ok(v) => Cell::Value(v),
                    Err(msg) => Cell::Error(ErrorValue::new(anyhow::anyhow!(msg), step_id)),
                }
            })
            .collect();
        ExecOutcome::ready(raw)
    }
}

fn combine(op: &CombineOp, values: &[CellValue]) -> std::result::Result<CellValue, String> {
    match op {
        CombineOp::Sum => {
            let mut total = 0.0;
            for v in values {
                total += v.as_f64().ok_or_else(|| format!("sum: not a number: {v}"))?;
            }
            Ok(serde_json::json!(total))
        }
        CombineOp::Concat => {
            let mut out = String::new();
            for v in values {
                out.push_str(v.as_str().ok_or_else(|| format!("concat: not a string: {v}"))?);
            }
            Ok(serde_json::json!(out))
        }
    }
}

/// Deliberately errors some (or all) rows — used to exercise the
/// error-aware invoker and in-band error propagation.
struct FailingStep {
    id: StepId,
    dependencies: Vec<StepId>,
    message: String,
    rows: Option<Vec<usize>>,
}

impl Step for FailingStep {
    fn id(&self) -> StepId {
        self.id
    }

    fn dependencies(&self) -> &[StepId] {
        &self.dependencies
    }

    fn execute(&self, deps: &[Column], extra: &StepExtra<'_>) -> ExecOutcome {
        let size = deps.first().map(Column::len).unwrap_or(extra.size);
        let step_id = self.id;
        let raw: RawColumn = (0..size)
            .map(|row| {
                let should_fail = self.rows.as_ref().map(|rows| rows.contains(&row)).unwrap_or(true);
                if should_fail {
                    Cell::Error(ErrorValue::new(anyhow::anyhow!(self.message.clone()), step_id))
                } else {
                    // Pass the input value through unchanged for rows this
                    // step doesn't target.
                    match deps.first().map(|col| &col[row]) {
                        Some(Ok(v)) => Cell::Value(v.clone()),
                        Some(Err(e)) => Cell::Error(e.clone()),
                        None => Cell::Value(CellValue::Null),
                    }
                }
            })
            .collect();
        ExecOutcome::ready(raw)
    }
}

/// Doubles its single numeric dependency behind a future, to exercise the
/// async dispatch path.
struct AsyncDoubleStep {
    id: StepId,
    dependencies: Vec<StepId>,
}

impl Step for AsyncDoubleStep {
    fn id(&self) -> StepId {
        self.id
    }

    fn dependencies(&self) -> &[StepId] {
        &self.dependencies
    }

    fn execute(&self, deps: &[Column], _extra: &StepExtra<'_>) -> ExecOutcome {
        let input = deps[0].clone();
        ExecOutcome::future(async move {
            let mut out = RawColumn::with_capacity(input.len());
            for cell in input {
                out.push(match cell {
                    Err(e) => Cell::Error(e),
                    Ok(v) => Cell::future(async move {
                        let n = v.as_f64().ok_or_else(|| anyhow::anyhow!("async_double: not a number: {v}"))?;
                        Ok(serde_json::json!(n * 2.0))
                    }),
                });
            }
            out
        })
    }
}
