//! Declarative layer-plan format: a `LayerPlan` described as data, so a
//! request's shape can be loaded from YAML instead of built by hand.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerPlanConfig {
    pub version: u32,
    pub id: String,
    pub steps: Vec<StepConfig>,
    #[serde(default)]
    pub children: Vec<ChildConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub id: u32,
    #[serde(default)]
    pub dependencies: Vec<u32>,
    pub kind: StepKind,

    // Payload (flattened) — each kind has its own fields.
    #[serde(flatten)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Const,
    Map,
    Combine,
    Failing,
    AsyncDouble,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildConfig {
    pub reason: String,
    pub plan: LayerPlanConfig,
}
