//! Audio cue notifications.
//!
//! The session fires cues and never waits on them; a sink that fails or
//! does nothing cannot change how a workout progresses.

use std::cell::RefCell;
use std::rc::Rc;

/// A named sound cue
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// Countdown beat, start beep, final-seconds warning
    Beep,
    /// A timed unit finished
    UnitDone,
    /// The whole routine finished
    Celebrate,
}

impl Cue {
    pub fn name(self) -> &'static str {
        match self {
            Cue::Beep => "beep",
            Cue::UnitDone => "unit_done",
            Cue::Celebrate => "celebrate",
        }
    }
}

/// Fire-and-forget cue player
pub trait CueSink {
    fn play_cue(&mut self, cue: Cue);
}

/// Sink that only records cues in the trace log
#[derive(Clone, Copy, Debug, Default)]
pub struct LogCues;

impl CueSink for LogCues {
    fn play_cue(&mut self, cue: Cue) {
        tracing::trace!("cue: {}", cue.name());
    }
}

/// Sink that remembers every cue. Clones share one recording.
#[derive(Clone, Debug, Default)]
pub struct RecordingCues {
    played: Rc<RefCell<Vec<Cue>>>,
}

impl RecordingCues {
    pub fn played(&self) -> Vec<Cue> {
        self.played.borrow().clone()
    }

    pub fn count(&self, cue: Cue) -> usize {
        self.played.borrow().iter().filter(|c| **c == cue).count()
    }
}

impl CueSink for RecordingCues {
    fn play_cue(&mut self, cue: Cue) {
        self.played.borrow_mut().push(cue);
    }
}
