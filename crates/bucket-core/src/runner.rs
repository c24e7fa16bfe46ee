//! Drives a `LayerPlan` to completion and reports the result.

use std::sync::Arc;

use anyhow::Result;
use bucket_dag::{Bucket, LayerPlan};
use bucket_runtime::{EventEmitter, RequestContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub plan_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub size: usize,
    pub has_errors: bool,
    pub columns: std::collections::BTreeMap<u32, Vec<CellReport>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum CellReport {
    Value(serde_json::Value),
    Error(String),
}

pub struct Runner;

impl Runner {
    /// Execute `plan` against a fresh bucket of `size` rows, using
    /// `event_emitter` for scheduler diagnostics, and summarize the result.
    pub fn run(plan: &LayerPlan, size: usize, event_emitter: Arc<dyn EventEmitter>) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let request = RequestContext::new(event_emitter);
        let mut bucket = Bucket::new(size);
        futures::executor::block_on(bucket_dag::execute_bucket(plan, &mut bucket, &request))?;

        let columns = bucket
            .columns()
            .map(|(step_id, column)| {
                let rows = column
                    .iter()
                    .map(|cell| match cell {
                        Ok(v) => CellReport::Value(v.clone()),
                        Err(e) => CellReport::Error(e.to_string()),
                    })
                    .collect();
                (step_id.index(), rows)
            })
            .collect();

        Ok(RunReport {
            run_id,
            plan_id: plan.id().to_string(),
            started_at,
            finished_at: Utc::now(),
            size,
            has_errors: bucket.has_errors(),
            columns,
        })
    }
}
