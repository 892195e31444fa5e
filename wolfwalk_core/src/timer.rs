//! Unit timer: a 3-2-1-Go countdown followed by a wall-clock sampled run.
//!
//! The timer has no thread of its own. The host calls [`UnitTimer::tick`]
//! on a sub-second cadence (250 ms by default) and receives the signals that
//! became due since the last call. Elapsed time is measured from wall-clock
//! samples and accumulated, so a host that is throttled and ticks late still
//! counts the right number of seconds.
//!
//! ## Phases
//!
//! ```text
//! Idle -> CountingDown -> Running <-> Paused
//! Running -> Idle        (elapsed or stop)
//! any     -> Idle        (stop)
//! ```
//!
//! The timer knows nothing about routines or sessions; whoever owns it
//! implements [`UnitTimerObserver`] and reacts to [`TimerSignal::Elapsed`].

use crate::types::TimerPhase;
use chrono::{DateTime, Duration, Utc};

/// Numbers shown before "Go".
pub const COUNTDOWN_FROM: u8 = 3;

const BEAT_MS: i64 = 1000;
const DEFAULT_GO_HOLD_MS: i64 = 500;

/// Something that happened while the timer was driven
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerSignal {
    /// Countdown number shown (3, 2, 1)
    CountdownBeat(u8),
    /// "Go!" shown
    Go,
    /// Pre-roll over, the run has begun
    CountdownFinished,
    /// `seconds_remaining` dropped on a whole-second boundary
    Second { remaining: u32 },
    /// One of the final three seconds was reached
    Warning { remaining: u32 },
    /// The run reached zero; the timer is back to Idle
    Elapsed,
}

/// Receiver of the single completion notification per timed unit
pub trait UnitTimerObserver {
    fn on_unit_timer_elapsed(&mut self, now: DateTime<Utc>);
}

#[derive(Clone, Debug)]
struct Countdown {
    /// Next number to show; 0 means "Go" is next
    next_beat: u8,
    go_shown: bool,
    next_at: DateTime<Utc>,
}

/// Countdown-then-run timer for one unit of a timed exercise
#[derive(Clone, Debug)]
pub struct UnitTimer {
    phase: TimerPhase,
    seconds_remaining: u32,
    go_hold_ms: i64,
    countdown: Option<Countdown>,
    /// Sampling baseline while Running. At most one exists.
    last_sample: Option<DateTime<Utc>>,
    fractional_ms: i64,
    pending_start: Option<DateTime<Utc>>,
}

impl Default for UnitTimer {
    fn default() -> Self {
        Self::new(DEFAULT_GO_HOLD_MS as u64)
    }
}

impl UnitTimer {
    /// Timer that holds "Go" on screen for `go_hold_ms` before running.
    pub fn new(go_hold_ms: u64) -> Self {
        Self {
            phase: TimerPhase::Idle,
            seconds_remaining: 0,
            go_hold_ms: go_hold_ms as i64,
            countdown: None,
            last_sample: None,
            fractional_ms: 0,
            pending_start: None,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    /// Number currently shown by the countdown, `None` once "Go" is up.
    pub fn countdown_display(&self) -> Option<u8> {
        self.countdown
            .as_ref()
            .filter(|c| !c.go_shown)
            .map(|c| c.next_beat + 1)
    }

    /// Whether a delayed auto-start is armed.
    pub fn has_pending_start(&self) -> bool {
        self.pending_start.is_some()
    }

    /// Stop everything and load `seconds` for a fresh run.
    pub fn initialize(&mut self, seconds: u32) {
        self.stop();
        self.seconds_remaining = seconds;
    }

    /// Restore a previously saved run in the Paused phase.
    pub fn restore_paused(&mut self, seconds: u32) {
        self.stop();
        self.seconds_remaining = seconds;
        self.phase = TimerPhase::Paused;
    }

    /// Begin the 3-2-1-Go pre-roll. The first beat is emitted immediately.
    pub fn start_countdown(&mut self, now: DateTime<Utc>) -> Vec<TimerSignal> {
        self.stop();
        self.phase = TimerPhase::CountingDown;
        self.countdown = Some(Countdown {
            next_beat: COUNTDOWN_FROM - 1,
            go_shown: false,
            next_at: now + Duration::milliseconds(BEAT_MS),
        });
        vec![TimerSignal::CountdownBeat(COUNTDOWN_FROM)]
    }

    /// Start running from a fresh wall-clock baseline.
    ///
    /// Any previous baseline, countdown or armed start is discarded first, so
    /// two sampling loops can never overlap.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.countdown = None;
        self.pending_start = None;
        self.phase = TimerPhase::Running;
        self.last_sample = Some(now);
        self.fractional_ms = 0;
    }

    /// Arm a start at `at`; it fires on the first tick at or after that instant.
    pub fn schedule_start(&mut self, at: DateTime<Utc>) {
        self.pending_start = Some(at);
    }

    /// Running -> Paused. No-op in any other phase.
    pub fn pause(&mut self) -> bool {
        if self.phase != TimerPhase::Running {
            return false;
        }
        self.last_sample = None;
        self.fractional_ms = 0;
        self.phase = TimerPhase::Paused;
        true
    }

    /// Paused -> Running with a fresh baseline. No-op in any other phase.
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase != TimerPhase::Paused {
            return false;
        }
        self.start(now);
        true
    }

    /// Cancel countdown, run and armed start. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.countdown = None;
        self.pending_start = None;
        self.last_sample = None;
        self.fractional_ms = 0;
        self.phase = TimerPhase::Idle;
    }

    /// Advance to `now` and return every signal that became due.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<TimerSignal> {
        let mut signals = Vec::new();

        if let Some(at) = self.pending_start {
            if now >= at {
                self.start(at);
            }
        }

        if self.phase == TimerPhase::CountingDown {
            self.advance_countdown(now, &mut signals);
        }

        if self.phase == TimerPhase::Running {
            self.sample(now, &mut signals);
        }

        signals
    }

    fn advance_countdown(&mut self, now: DateTime<Utc>, signals: &mut Vec<TimerSignal>) {
        while let Some(countdown) = self.countdown.as_mut() {
            if now < countdown.next_at {
                return;
            }

            if countdown.next_beat > 0 {
                signals.push(TimerSignal::CountdownBeat(countdown.next_beat));
                countdown.next_beat -= 1;
                countdown.next_at += Duration::milliseconds(BEAT_MS);
            } else if !countdown.go_shown {
                signals.push(TimerSignal::Go);
                countdown.go_shown = true;
                countdown.next_at += Duration::milliseconds(self.go_hold_ms);
            } else {
                let began_at = countdown.next_at;
                self.start(began_at);
                signals.push(TimerSignal::CountdownFinished);
            }
        }
    }

    fn sample(&mut self, now: DateTime<Utc>, signals: &mut Vec<TimerSignal>) {
        let Some(last) = self.last_sample else {
            return;
        };
        if now <= last {
            return;
        }

        self.fractional_ms += (now - last).num_milliseconds();
        self.last_sample = Some(now);

        if self.fractional_ms < 1000 {
            return;
        }

        let whole = (self.fractional_ms / 1000) as u32;
        self.fractional_ms %= 1000;
        self.seconds_remaining = self.seconds_remaining.saturating_sub(whole);

        let remaining = self.seconds_remaining;
        signals.push(TimerSignal::Second { remaining });
        if (1..=3).contains(&remaining) {
            signals.push(TimerSignal::Warning { remaining });
        }

        if remaining == 0 {
            self.stop();
            signals.push(TimerSignal::Elapsed);
        }
    }
}
