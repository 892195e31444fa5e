//! Snapshot codec: the persisted subset of a session.
//!
//! A snapshot never brings a live countdown back. Whatever the timer was
//! doing when it was saved, a restored timed unit comes back Paused and the
//! child has to resume it.

use crate::progression::{CompletedSet, ProgressionState};
use crate::rest_gate::{PendingAdvance, RestGate};
use crate::routine::Routine;
use crate::store::{storage_key, SnapshotStore};
use crate::timer::UnitTimer;
use crate::types::{Side, TimerPhase, WorkoutLength};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Store key of the in-progress session
pub fn session_key() -> String {
    storage_key("session")
}

/// Persisted session record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub step_index: usize,
    pub set_index: u32,
    pub side: Side,
    pub started: bool,
    /// True when the timer was running, paused or counting down
    #[serde(default)]
    pub timer_paused: bool,
    #[serde(default)]
    pub seconds_remaining: u32,
    #[serde(default)]
    pub session_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rep_count: u32,
    #[serde(default)]
    pub workout_length: WorkoutLength,
    #[serde(default)]
    pub completed_steps: CompletedSet,
    #[serde(default)]
    pub rest_pending: Option<PendingAdvance>,
}

/// Live state rebuilt from a snapshot
#[derive(Clone, Debug)]
pub struct Restored {
    pub state: ProgressionState,
    pub completed: CompletedSet,
    pub gate: RestGate,
}

impl Snapshot {
    pub fn capture(
        state: &ProgressionState,
        completed: &CompletedSet,
        gate: &RestGate,
        workout_length: WorkoutLength,
    ) -> Self {
        Self {
            step_index: state.step_index,
            set_index: state.set_index,
            side: state.side,
            started: state.started,
            timer_paused: state.timer_phase() != TimerPhase::Idle,
            seconds_remaining: state.seconds_remaining(),
            session_started_at: state.session_started_at,
            rep_count: state.rep_count,
            workout_length,
            completed_steps: completed.clone(),
            rest_pending: gate.pending(),
        }
    }

    pub fn to_value(&self) -> Value {
        // A struct of plain fields always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Decode a stored value; malformed input is treated as no snapshot.
    pub fn from_value(value: Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Ignoring malformed session snapshot: {}", e);
                None
            }
        }
    }

    /// Load the saved snapshot if it describes a session worth resuming.
    pub fn load_resumable(store: &dyn SnapshotStore) -> Option<Self> {
        let snapshot = Self::from_value(store.load(&session_key())?)?;
        if snapshot.is_resumable() {
            Some(snapshot)
        } else {
            None
        }
    }

    pub fn is_resumable(&self) -> bool {
        self.started
    }

    /// Rebuild live state against `routine`.
    ///
    /// Returns `None` when the snapshot does not fit the routine (a routine
    /// that changed since the save, a hand-edited file).
    pub fn restore(&self, routine: &Routine, timer: UnitTimer) -> Option<Restored> {
        let mut state = ProgressionState::new(routine);
        state.timer = timer;
        state.step_index = self.step_index;
        state.set_index = self.set_index;
        state.side = self.side;
        state.started = self.started;
        state.rep_count = self.rep_count;
        state.session_started_at = self.session_started_at;

        let completed = self.completed_steps.clone();
        if let Err(e) = state.check_invariants(routine, &completed) {
            tracing::warn!("Saved session does not fit the routine: {}", e);
            return None;
        }

        let step = routine.step(self.step_index);
        if let Some(full) = step.timer_seconds() {
            let seconds = match self.seconds_remaining {
                0 => full,
                s => s.min(full),
            };
            state.timer.restore_paused(seconds);
        }

        let gate = match self.rest_pending {
            Some(PendingAdvance::NextSet) if self.set_index < step.last_set_index() => {
                RestGate::open(routine, self.step_index, self.set_index, PendingAdvance::NextSet)
            }
            Some(PendingAdvance::NextStep) if self.step_index < routine.last_index() => {
                RestGate::open(routine, self.step_index, self.set_index, PendingAdvance::NextStep)
            }
            _ => RestGate::Closed,
        };

        Some(Restored {
            state,
            completed,
            gate,
        })
    }
}
