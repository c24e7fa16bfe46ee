//! Opaque step identity.

use std::fmt;

/// A dense integer identifying a step within a single layer plan.
///
/// `StepId`s are only meaningful relative to the `LayerPlan` that produced
/// them (typically its index into the plan's step array) — they carry no
/// identity across plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepId(u32);

impl StepId {
    /// Construct a `StepId` from a dense index. Plan builders are the only
    /// expected caller; scheduler code should treat ids as opaque.
    pub fn from_index(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
