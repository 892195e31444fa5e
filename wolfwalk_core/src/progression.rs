//! Progression state: the cursor through a routine and its invariants.
//!
//! A *unit* is one (step, set, side) triple. The cursor only ever moves one
//! unit at a time; the rules for moving live in [`crate::session`].

use crate::routine::Routine;
use crate::timer::UnitTimer;
use crate::types::{Side, TimerPhase};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One (step, set, side) position in a routine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub step_index: usize,
    pub set_index: u32,
    pub side: Side,
}

impl Unit {
    /// The first unit of `step_index`.
    pub fn first_of(routine: &Routine, step_index: usize) -> Self {
        Self {
            step_index,
            set_index: 0,
            side: routine.step(step_index).first_side(),
        }
    }

    /// The last unit of `step_index`.
    pub fn last_of(routine: &Routine, step_index: usize) -> Self {
        let step = routine.step(step_index);
        Self {
            step_index,
            set_index: step.last_set_index(),
            side: step.last_side(),
        }
    }
}

/// Mutable cursor of a workout session
#[derive(Clone, Debug)]
pub struct ProgressionState {
    pub step_index: usize,
    pub set_index: u32,
    pub side: Side,
    pub started: bool,
    /// Display-only rep tally for the current unit
    pub rep_count: u32,
    pub timer: UnitTimer,
    pub session_started_at: Option<DateTime<Utc>>,
    pub session_ended_at: Option<DateTime<Utc>>,
}

impl ProgressionState {
    /// Fresh cursor at the first unit of `routine`.
    pub fn new(routine: &Routine) -> Self {
        let first = Unit::first_of(routine, 0);
        Self {
            step_index: first.step_index,
            set_index: first.set_index,
            side: first.side,
            started: false,
            rep_count: 0,
            timer: UnitTimer::default(),
            session_started_at: None,
            session_ended_at: None,
        }
    }

    pub fn unit(&self) -> Unit {
        Unit {
            step_index: self.step_index,
            set_index: self.set_index,
            side: self.side,
        }
    }

    /// Move the cursor to `unit` and clear the rep tally.
    pub fn move_to(&mut self, unit: Unit) {
        self.step_index = unit.step_index;
        self.set_index = unit.set_index;
        self.side = unit.side;
        self.rep_count = 0;
    }

    pub fn timer_phase(&self) -> TimerPhase {
        self.timer.phase()
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.timer.seconds_remaining()
    }

    /// First unit of the first step.
    pub fn is_at_beginning(&self) -> bool {
        self.step_index == 0 && self.set_index == 0 && self.side != Side::Left
    }

    /// Last unit of the last step.
    pub fn is_at_end(&self, routine: &Routine) -> bool {
        self.unit() == Unit::last_of(routine, routine.last_index())
    }

    /// Check the cursor invariants against `routine`, reporting the first violation.
    pub fn check_invariants(&self, routine: &Routine, completed: &CompletedSet) -> Result<()> {
        let step = routine.get(self.step_index).ok_or_else(|| {
            Error::State(format!(
                "step index {} outside routine of {} steps",
                self.step_index,
                routine.len()
            ))
        })?;

        if (self.side == Side::None) == step.per_side {
            return Err(Error::State(format!(
                "side {:?} does not match per-side={} for '{}'",
                self.side, step.per_side, step.name
            )));
        }

        if self.set_index >= step.set_count {
            return Err(Error::State(format!(
                "set index {} outside {} sets of '{}'",
                self.set_index, step.set_count, step.name
            )));
        }

        if self.timer.phase() != TimerPhase::Idle && !step.is_timed() {
            return Err(Error::State(format!(
                "timer is {:?} on untimed step '{}'",
                self.timer.phase(),
                step.name
            )));
        }

        if let Some(bad) = completed.iter().find(|&i| i >= routine.len()) {
            return Err(Error::State(format!(
                "completed step {} outside routine",
                bad
            )));
        }

        Ok(())
    }
}

/// Indices of steps whose every set (and side) has been finished
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletedSet(BTreeSet<usize>);

impl CompletedSet {
    pub fn insert(&mut self, step_index: usize) -> bool {
        self.0.insert(step_index)
    }

    pub fn remove(&mut self, step_index: usize) -> bool {
        self.0.remove(&step_index)
    }

    pub fn contains(&self, step_index: usize) -> bool {
        self.0.contains(&step_index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Whole-percent share of `total` steps that are complete.
    pub fn percent_of(&self, total: usize) -> u32 {
        if total == 0 {
            return 0;
        }
        ((self.0.len() * 100) as f64 / total as f64).round() as u32
    }
}

impl FromIterator<usize> for CompletedSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
