//! The per-request ambient input: `metaByStepId` and the event emitter.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::events::{EventEmitter, NullEventEmitter};
use crate::id::StepId;

/// An opaque per-step scratchpad. Steps downcast this themselves; the
/// executor never inspects it.
pub type StepMeta = Arc<dyn Any + Send + Sync>;

/// Everything `executeBucket` needs from the host besides the plan and the
/// bucket: a per-step scratchpad map that persists across the request, and
/// a diagnostic event handle. Scoped to exactly one request.
pub struct RequestContext {
    meta_by_step_id: HashMap<StepId, StepMeta>,
    event_emitter: Arc<dyn EventEmitter>,
}

impl RequestContext {
    pub fn new(event_emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            meta_by_step_id: HashMap::new(),
            event_emitter,
        }
    }

    pub fn with_meta(mut self, step_id: StepId, meta: StepMeta) -> Self {
        self.meta_by_step_id.insert(step_id, meta);
        self
    }

    pub fn meta(&self, step_id: StepId) -> Option<&StepMeta> {
        self.meta_by_step_id.get(&step_id)
    }

    pub fn event_emitter(&self) -> &Arc<dyn EventEmitter> {
        &self.event_emitter
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(Arc::new(NullEventEmitter))
    }
}
