//! Builds a `bucket_dag::LayerPlan` from its declarative config.

use anyhow::{Context, Result};
use bucket_dag::{ChildLayerPlan, ChildReason, LayerPlan};

use crate::config::LayerPlanConfig;
use crate::steps::build_step;

pub fn build_plan(cfg: &LayerPlanConfig) -> Result<LayerPlan> {
    let steps = cfg
        .steps
        .iter()
        .map(build_step)
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("layer plan `{}`: building steps", cfg.id))?;

    let children = cfg
        .children
        .iter()
        .map(|child| -> Result<ChildLayerPlan> {
            Ok(ChildLayerPlan {
                reason: ChildReason::parse(&child.reason),
                plan: build_plan(&child.plan)
                    .with_context(|| format!("layer plan `{}`: building child `{}`", cfg.id, child.reason))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let plan = LayerPlan::new(cfg.id.clone(), steps)
        .with_context(|| format!("layer plan `{}`: invalid plan", cfg.id))?
        .with_children(children);
    Ok(plan)
}
