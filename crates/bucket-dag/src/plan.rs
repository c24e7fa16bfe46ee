//! `LayerPlan`: the static, shared-immutable DAG a bucket is executed
//! against.

use std::collections::HashMap;

use bucket_runtime::StepId;

use crate::bucket::Bucket;
use crate::step::Step;

/// Why a child layer plan is attached to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildReason {
    Root,
    ListItem,
    MutationField,
    Polymorphic,
    Subroutine,
    Subscription,
    Defer,
    Stream,
    /// A reason tag this executor doesn't recognize. Plans are frequently
    /// produced by an external, serialized planner (see
    /// `bucket-core::config`), so an unrecognized tag is reachable data,
    /// not something the type system can rule out by construction — it's
    /// surfaced as a fatal error, not treated as impossible.
    Unknown(String),
}

impl ChildReason {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "root" => ChildReason::Root,
            "list_item" => ChildReason::ListItem,
            "mutation_field" => ChildReason::MutationField,
            "polymorphic" => ChildReason::Polymorphic,
            "subroutine" => ChildReason::Subroutine,
            "subscription" => ChildReason::Subscription,
            "defer" => ChildReason::Defer,
            "stream" => ChildReason::Stream,
            other => ChildReason::Unknown(other.to_string()),
        }
    }
}

/// A successor phase, dispatched after its parent bucket completes.
pub struct ChildLayerPlan {
    pub reason: ChildReason,
    pub plan: LayerPlan,
}

/// One step plus its precomputed reverse edges.
struct StepNode {
    step: Box<dyn Step>,
    dependents: Vec<StepId>,
}

/// Errors raised while *constructing* a `LayerPlan`. These are planner bugs
/// caught as early as possible, before any bucket ever runs against the
/// plan — distinct from `FatalError`, which covers violations discovered
/// while actually executing one.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("duplicate step id {0}")]
    DuplicateStepId(StepId),
    #[error("step {step_id} depends on unknown step {dependency}")]
    UnknownDependency { step_id: StepId, dependency: StepId },
    #[error("layer plan `{layer_id}` has a dependency cycle involving step {step_id}")]
    Cycle { layer_id: String, step_id: StepId },
}

/// A static DAG of steps belonging to one execution phase: an ordered
/// sequence of steps, their precomputed start set, and declared children.
pub struct LayerPlan {
    id: String,
    nodes: HashMap<StepId, StepNode>,
    order: Vec<StepId>,
    start_steps: Vec<StepId>,
    pub children: Vec<ChildLayerPlan>,
}

impl LayerPlan {
    /// Build a plan from its steps, computing each step's dependents as
    /// the reverse of its declared `dependencies`, and validating that
    /// the induced graph is acyclic.
    pub fn new(id: impl Into<String>, steps: Vec<Box<dyn Step>>) -> Result<Self, PlanError> {
        let id = id.into();
        let mut order = Vec::with_capacity(steps.len());
        let mut nodes: HashMap<StepId, StepNode> = HashMap::with_capacity(steps.len());

        for step in steps {
            let step_id = step.id();
            if nodes.contains_key(&step_id) {
                return Err(PlanError::DuplicateStepId(step_id));
            }
            order.push(step_id);
            nodes.insert(
                step_id,
                StepNode {
                    step,
                    dependents: Vec::new(),
                },
            );
        }

        // Reverse edges: for every step, register it as a dependent of
        // each of its declared dependencies.
        for &step_id in &order {
            let deps = nodes[&step_id].step.dependencies().to_vec();
            for dep in deps {
                let dep_node = nodes
                    .get_mut(&dep)
                    .ok_or(PlanError::UnknownDependency { step_id, dependency: dep })?;
                dep_node.dependents.push(step_id);
            }
        }

        let start_steps = order
            .iter()
            .copied()
            .filter(|id| nodes[id].step.dependencies().is_empty())
            .collect();

        let plan = Self {
            id: id.clone(),
            nodes,
            order,
            start_steps,
            children: Vec::new(),
        };
        plan.check_acyclic()?;
        Ok(plan)
    }

    pub fn with_children(mut self, children: Vec<ChildLayerPlan>) -> Self {
        self.children = children;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start_steps(&self) -> &[StepId] {
        &self.start_steps
    }

    pub fn steps(&self) -> &[StepId] {
        &self.order
    }

    pub fn step(&self, id: StepId) -> Option<&dyn Step> {
        self.nodes.get(&id).map(|n| n.step.as_ref())
    }

    pub fn dependents(&self, id: StepId) -> &[StepId] {
        self.nodes
            .get(&id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    fn check_acyclic(&self) -> Result<(), PlanError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }
        let mut marks: HashMap<StepId, Mark> = self
            .order
            .iter()
            .map(|&id| (id, Mark::Unvisited))
            .collect();

        fn visit(
            id: StepId,
            nodes: &HashMap<StepId, StepNode>,
            marks: &mut HashMap<StepId, Mark>,
            layer_id: &str,
        ) -> Result<(), PlanError> {
            match marks.get(&id).copied().unwrap_or(Mark::Unvisited) {
                Mark::Done => return Ok(()),
                Mark::InProgress => {
                    return Err(PlanError::Cycle {
                        layer_id: layer_id.to_string(),
                        step_id: id,
                    });
                }
                Mark::Unvisited => {}
            }
            marks.insert(id, Mark::InProgress);
            for &dep in nodes[&id].step.dependencies() {
                visit(dep, nodes, marks, layer_id)?;
            }
            marks.insert(id, Mark::Done);
            Ok(())
        }

        for &id in &self.order {
            visit(id, &self.nodes, &mut marks, &self.id)?;
        }
        Ok(())
    }
}

/// Whether every dependency of `step_id` is already published in `bucket`
/// — the scheduler's readiness predicate.
pub(crate) fn is_ready(plan: &LayerPlan, step_id: StepId, bucket: &Bucket) -> bool {
    plan.step(step_id)
        .map(|step| {
            step.dependencies()
                .iter()
                .all(|d| bucket.is_published(*d))
        })
        .unwrap_or(false)
}
