//! Rest gate shown between Strength sets and after Strength exercises.

use crate::routine::Routine;
use crate::types::ExerciseStep;
use serde::{Deserialize, Serialize};

/// Move that is held back until the child says they are ready
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAdvance {
    NextSet,
    NextStep,
}

/// Two-state latch: closed during normal flow, open while resting
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RestGate {
    #[default]
    Closed,
    Open {
        message: String,
        pending: PendingAdvance,
    },
}

impl RestGate {
    /// Open gate for a rest taken at (`step_index`, `set_index`).
    pub fn open(routine: &Routine, step_index: usize, set_index: u32, pending: PendingAdvance) -> Self {
        let message = match pending {
            PendingAdvance::NextSet => format!("Up next: Set {}", set_index + 2),
            PendingAdvance::NextStep => format!("Up next: {}", routine.step(step_index + 1).name),
        };
        RestGate::Open { message, pending }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, RestGate::Open { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            RestGate::Open { message, .. } => Some(message),
            RestGate::Closed => None,
        }
    }

    pub fn pending(&self) -> Option<PendingAdvance> {
        match self {
            RestGate::Open { pending, .. } => Some(*pending),
            RestGate::Closed => None,
        }
    }

    /// Close the gate, handing back the deferred move.
    pub fn acknowledge(&mut self) -> Option<PendingAdvance> {
        let pending = self.pending();
        *self = RestGate::Closed;
        pending
    }
}

/// Whether finishing the current unit of `step` should rest first.
///
/// Only Strength steps rest, and only when something follows in the routine.
pub fn rest_due(step: &ExerciseStep, more_follows: bool) -> bool {
    step.category.rests_between_sets() && more_follows
}
