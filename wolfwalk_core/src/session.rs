//! Navigation engine: the routine progression state machine.
//!
//! A [`Session`] owns the routine, the cursor, the completed-step set, the
//! rest gate and the unit timer, plus the collaborators it reports to.
//! Presentation code issues commands and drives time with [`Session::tick`];
//! after every mutation the session saves a snapshot and re-renders.
//!
//! Commands that make no sense in the current state are ignored and logged
//! at `debug`. None of them can fail.

use crate::cues::{Cue, CueSink};
use crate::motivation::Motivator;
use crate::progression::{CompletedSet, ProgressionState, Unit};
use crate::rest_gate::{rest_due, PendingAdvance, RestGate};
use crate::routine::{Routine, RoutinePlan};
use crate::snapshot::{session_key, Snapshot};
use crate::store::SnapshotStore;
use crate::timer::{TimerSignal, UnitTimer, UnitTimerObserver};
use crate::types::{Side, TimerPhase, WorkoutLength};
use crate::view::{CompletionSummary, Renderer, SessionView};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;

/// Timing knobs of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// Delay before the Left side starts after the Right side finished
    pub side_switch_delay_ms: u64,
    /// How long "Go!" stays up before the run begins
    pub go_hold_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            side_switch_delay_ms: 500,
            go_hold_ms: 500,
        }
    }
}

/// The outside world a session talks to
pub struct Collaborators {
    pub store: Box<dyn SnapshotStore>,
    pub motivator: Box<dyn Motivator>,
    pub cues: Box<dyn CueSink>,
    pub renderer: Box<dyn Renderer>,
}

pub struct Session {
    plan: RoutinePlan,
    length: WorkoutLength,
    routine: Routine,
    settings: SessionSettings,
    state: ProgressionState,
    completed: CompletedSet,
    gate: RestGate,
    skipped: BTreeSet<usize>,
    completion: Option<CompletionSummary>,
    store: Box<dyn SnapshotStore>,
    motivator: Box<dyn Motivator>,
    cues: Box<dyn CueSink>,
    renderer: Box<dyn Renderer>,
}

impl Session {
    pub fn new(
        plan: RoutinePlan,
        length: WorkoutLength,
        settings: SessionSettings,
        collaborators: Collaborators,
    ) -> Self {
        let routine = plan.variant(length);
        let state = fresh_state(&routine, &settings);
        Self {
            plan,
            length,
            routine,
            settings,
            state,
            completed: CompletedSet::default(),
            gate: RestGate::Closed,
            skipped: BTreeSet::new(),
            completion: None,
            store: collaborators.store,
            motivator: collaborators.motivator,
            cues: collaborators.cues,
            renderer: collaborators.renderer,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn routine(&self) -> &Routine {
        &self.routine
    }

    pub fn workout_length(&self) -> WorkoutLength {
        self.length
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn completed(&self) -> &CompletedSet {
        &self.completed
    }

    pub fn is_rest_gate_open(&self) -> bool {
        self.gate.is_open()
    }

    pub fn rest_message(&self) -> Option<&str> {
        self.gate.message()
    }

    pub fn completion(&self) -> Option<&CompletionSummary> {
        self.completion.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.completion.is_some()
    }

    /// Whether the host needs to keep calling [`Session::tick`].
    pub fn timer_active(&self) -> bool {
        matches!(
            self.state.timer_phase(),
            TimerPhase::CountingDown | TimerPhase::Running
        ) || self.state.timer.has_pending_start()
    }

    pub fn view(&self) -> SessionView {
        let step = self.routine.step(self.state.step_index);
        let countdown = match self.state.timer_phase() {
            TimerPhase::CountingDown => Some(
                self.state
                    .timer
                    .countdown_display()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "Go!".to_string()),
            ),
            _ => None,
        };

        SessionView {
            workout_length: self.length,
            started: self.state.started,
            step_number: self.state.step_index + 1,
            step_count: self.routine.len(),
            name: step.name.clone(),
            category: step.category,
            mode: step.mode(),
            purpose: step.purpose.clone(),
            instructions: step.instructions.clone(),
            image: step.image.clone(),
            metric_label: step.metric_label(),
            set_number: self.state.set_index + 1,
            set_count: step.set_count,
            side: self.state.side,
            timer_phase: self.state.timer_phase(),
            seconds_remaining: self.state.seconds_remaining(),
            countdown,
            rep_count: self.state.rep_count,
            rep_target: if step.is_timed() {
                None
            } else {
                Some(step.magnitude.amount())
            },
            rest_message: self.gate.message().map(str::to_string),
            completed_steps: self.completed.iter().collect(),
            percent_complete: self.completed.percent_of(self.routine.len()),
            can_go_back: self.state.started && !self.state.is_at_beginning(),
            completion: self.completion.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Resume
    // ------------------------------------------------------------------

    /// The saved session, if there is one worth offering.
    pub fn saved_snapshot(&self) -> Option<Snapshot> {
        Snapshot::load_resumable(self.store.as_ref())
    }

    /// Replace the current state with the saved session.
    ///
    /// Returns `false` (and drops the saved record) when nothing resumable
    /// was found or it no longer fits its routine.
    pub fn resume_saved(&mut self) -> bool {
        let Some(snapshot) = self.saved_snapshot() else {
            return false;
        };

        let routine = self.plan.variant(snapshot.workout_length);
        let timer = UnitTimer::new(self.settings.go_hold_ms);
        let Some(restored) = snapshot.restore(&routine, timer) else {
            self.store.clear(&session_key());
            return false;
        };

        self.length = snapshot.workout_length;
        self.routine = routine;
        self.state = restored.state;
        self.completed = restored.completed;
        self.gate = restored.gate;
        self.skipped.clear();
        self.completion = None;

        tracing::info!(
            "Resumed session at step {} set {} ({})",
            self.state.step_index + 1,
            self.state.set_index + 1,
            self.length
        );
        self.render();
        true
    }

    /// Forget the saved session without touching the live one.
    pub fn discard_saved(&mut self) {
        self.store.clear(&session_key());
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Swap between the long and short routine. Only before the session starts.
    pub fn select_workout_length(&mut self, length: WorkoutLength) {
        if self.state.started {
            tracing::debug!("Ignoring length change: session already started");
            return;
        }

        self.length = length;
        self.routine = self.plan.variant(length);
        self.state = fresh_state(&self.routine, &self.settings);
        self.completed.clear();
        self.gate = RestGate::Closed;
        tracing::debug!("Selected {} workout ({} steps)", length, self.routine.len());
        self.commit();
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.state.started || self.is_finished() {
            tracing::debug!("Ignoring start: session already started");
            return;
        }

        self.state.started = true;
        self.state.session_started_at = Some(now);
        self.cues.play_cue(Cue::Beep);
        tracing::info!("Session started ({} workout)", self.length);

        if let Some(seconds) = self.current_timer_seconds() {
            self.state.timer.initialize(seconds);
            let signals = self.state.timer.start_countdown(now);
            self.handle_signals(signals, now);
        }
        self.commit();
    }

    /// The big button: start, pause/resume a timer, or finish an untimed unit.
    pub fn primary_action(&mut self, now: DateTime<Utc>) {
        if self.blocked("primary action") {
            return;
        }
        if !self.state.started {
            self.start(now);
            return;
        }

        match self.current_timer_seconds() {
            Some(seconds) => match self.state.timer_phase() {
                TimerPhase::Running => {
                    self.state.timer.pause();
                }
                TimerPhase::Paused => {
                    self.state.timer.resume(now);
                }
                TimerPhase::CountingDown => {
                    tracing::debug!("Ignoring primary action during countdown");
                    return;
                }
                TimerPhase::Idle => {
                    self.state.timer.initialize(seconds);
                    let signals = self.state.timer.start_countdown(now);
                    self.handle_signals(signals, now);
                }
            },
            None => self.advance_unit(now),
        }
        self.commit();
    }

    pub fn pause(&mut self) {
        if self.blocked("pause") {
            return;
        }
        if self.state.timer.pause() {
            self.commit();
        } else {
            tracing::debug!("Ignoring pause in {:?}", self.state.timer_phase());
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.blocked("resume") {
            return;
        }
        if self.state.timer.resume(now) {
            self.commit();
        } else {
            tracing::debug!("Ignoring resume in {:?}", self.state.timer_phase());
        }
    }

    /// Count one rep or step on an untimed unit.
    pub fn tally_rep(&mut self) {
        if self.blocked("tally") || !self.state.started {
            return;
        }
        let step = self.routine.step(self.state.step_index);
        if step.is_timed() || self.state.rep_count >= step.magnitude.amount() {
            tracing::debug!("Ignoring tally on '{}'", step.name);
            return;
        }
        self.state.rep_count += 1;
        self.commit();
    }

    /// Move one unit backward. Never starts a timer.
    pub fn back(&mut self) {
        if self.blocked("back") {
            return;
        }
        if self.state.is_at_beginning() {
            tracing::debug!("Ignoring back at the first unit");
            return;
        }

        self.state.timer.stop();

        let index = self.state.step_index;
        let step = self.routine.step(index);
        let target = if step.per_side && self.state.side == Side::Left {
            Unit {
                side: Side::Right,
                ..self.state.unit()
            }
        } else if self.state.set_index == 0 {
            self.completed.remove(index);
            let previous = Unit::last_of(&self.routine, index - 1);
            self.completed.remove(previous.step_index);
            previous
        } else {
            Unit {
                step_index: index,
                set_index: self.state.set_index - 1,
                side: step.last_side(),
            }
        };

        self.state.move_to(target);
        if let Some(seconds) = self.current_timer_seconds() {
            self.state.timer.initialize(seconds);
        }
        tracing::debug!("Back to {:?}", target);
        self.commit();
    }

    /// Mark the current step done and move past it.
    pub fn skip(&mut self, now: DateTime<Utc>) {
        if self.blocked("skip") || !self.state.started {
            return;
        }

        self.state.timer.stop();

        let index = self.state.step_index;
        self.completed.insert(index);
        self.skipped.insert(index);
        let more_follows = index < self.routine.last_index();

        if rest_due(self.routine.step(index), more_follows) {
            self.open_rest_gate(PendingAdvance::NextStep);
        } else if more_follows {
            self.next_step(now, false);
        } else {
            // Last step: stays on screen, marked complete.
            if let Some(seconds) = self.current_timer_seconds() {
                self.state.timer.initialize(seconds);
            }
        }
        tracing::debug!("Skipped step {}", index + 1);
        self.commit();
    }

    /// Leave the rest screen and perform the move it was holding back.
    pub fn ready_after_rest(&mut self, now: DateTime<Utc>) {
        match self.gate.acknowledge() {
            Some(PendingAdvance::NextSet) => self.next_set(now, true),
            Some(PendingAdvance::NextStep) => self.next_step(now, true),
            None => {
                tracing::debug!("Ignoring ready: not resting");
                return;
            }
        }
        self.commit();
    }

    /// Throw the session away and go back to the first unit.
    ///
    /// `confirmed` must come from an explicit user confirmation.
    pub fn restart(&mut self, confirmed: bool) {
        if !confirmed {
            tracing::debug!("Restart not confirmed");
            return;
        }

        self.state.timer.stop();
        self.state = fresh_state(&self.routine, &self.settings);
        self.completed.clear();
        self.gate = RestGate::Closed;
        self.skipped.clear();
        self.completion = None;
        self.store.clear(&session_key());
        tracing::info!("Session restarted");
        self.render();
    }

    /// Drive the timer to `now` and react to whatever became due.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.is_finished() {
            return;
        }
        let signals = self.state.timer.tick(now);
        if signals.is_empty() {
            return;
        }
        self.handle_signals(signals, now);
        self.commit();
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn blocked(&self, command: &str) -> bool {
        if self.is_finished() {
            tracing::debug!("Ignoring {}: session finished", command);
            return true;
        }
        if self.gate.is_open() {
            tracing::debug!("Ignoring {}: resting", command);
            return true;
        }
        false
    }

    fn current_timer_seconds(&self) -> Option<u32> {
        self.routine.step(self.state.step_index).timer_seconds()
    }

    /// One unit forward, on primary action for untimed units or timer completion.
    fn advance_unit(&mut self, now: DateTime<Utc>) {
        let index = self.state.step_index;
        let step = self.routine.step(index);
        let per_side = step.per_side;
        let last_set = step.last_set_index();
        let more_follows = index < self.routine.last_index();

        if per_side && self.state.side == Side::Right {
            self.state.move_to(Unit {
                side: Side::Left,
                ..self.state.unit()
            });
            if let Some(seconds) = self.current_timer_seconds() {
                self.state.timer.initialize(seconds);
                let delay = Duration::milliseconds(self.settings.side_switch_delay_ms as i64);
                self.state.timer.schedule_start(now + delay);
            }
            tracing::debug!("Step {} set {}: switching to Left", index + 1, self.state.set_index + 1);
        } else if self.state.set_index < last_set {
            if rest_due(step, true) {
                self.open_rest_gate(PendingAdvance::NextSet);
            } else {
                self.next_set(now, true);
            }
        } else {
            self.completed.insert(index);
            if !more_follows {
                self.finish(now);
            } else if rest_due(step, true) {
                self.open_rest_gate(PendingAdvance::NextStep);
            } else {
                self.next_step(now, true);
            }
        }
    }

    fn next_set(&mut self, now: DateTime<Utc>, auto_start: bool) {
        let index = self.state.step_index;
        let side = self.routine.step(index).first_side();
        self.state.move_to(Unit {
            step_index: index,
            set_index: self.state.set_index + 1,
            side,
        });
        self.arm_timer(now, auto_start);
        tracing::debug!("Step {} set {}", index + 1, self.state.set_index + 1);
    }

    fn next_step(&mut self, now: DateTime<Utc>, auto_start: bool) {
        let next = Unit::first_of(&self.routine, self.state.step_index + 1);
        self.state.move_to(next);
        self.arm_timer(now, auto_start);
        tracing::debug!("Step {}: {}", next.step_index + 1, self.routine.step(next.step_index).name);
    }

    fn arm_timer(&mut self, now: DateTime<Utc>, auto_start: bool) {
        match self.current_timer_seconds() {
            Some(seconds) => {
                self.state.timer.initialize(seconds);
                if auto_start {
                    self.state.timer.start(now);
                }
            }
            None => self.state.timer.stop(),
        }
    }

    fn open_rest_gate(&mut self, pending: PendingAdvance) {
        self.state.timer.stop();
        self.gate = RestGate::open(
            &self.routine,
            self.state.step_index,
            self.state.set_index,
            pending,
        );
        tracing::debug!("Resting: {}", self.gate.message().unwrap_or_default());
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        self.state.timer.stop();
        self.state.session_ended_at = Some(now);

        let started_at = self.state.session_started_at.unwrap_or(now);
        let exercise_count = self.routine.len() as u32;
        let rewards = self.motivator.on_session_complete(exercise_count);
        self.cues.play_cue(Cue::Celebrate);

        let summary = CompletionSummary {
            workout_length: self.length,
            started_at,
            completed_at: now,
            duration_seconds: (now - started_at).num_seconds().max(0),
            exercise_count,
            skipped_steps: self.skipped.iter().copied().collect(),
            rewards,
        };
        tracing::info!(
            "Session complete: {} exercises in {}s",
            summary.exercise_count,
            summary.duration_seconds
        );
        self.completion = Some(summary);
        self.store.clear(&session_key());
    }

    fn handle_signals(&mut self, signals: Vec<TimerSignal>, now: DateTime<Utc>) {
        for signal in signals {
            match signal {
                TimerSignal::CountdownBeat(_) | TimerSignal::Go | TimerSignal::Warning { .. } => {
                    self.cues.play_cue(Cue::Beep)
                }
                TimerSignal::CountdownFinished | TimerSignal::Second { .. } => {}
                TimerSignal::Elapsed => {
                    self.cues.play_cue(Cue::UnitDone);
                    self.on_unit_timer_elapsed(now);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Side effects
    // ------------------------------------------------------------------

    fn commit(&mut self) {
        self.persist();
        self.render();
    }

    fn persist(&mut self) {
        if !self.state.started || self.is_finished() {
            return;
        }
        let snapshot = Snapshot::capture(&self.state, &self.completed, &self.gate, self.length);
        self.store.save(&session_key(), &snapshot.to_value());
    }

    fn render(&mut self) {
        let view = self.view();
        self.renderer.render(&view);
    }
}

impl UnitTimerObserver for Session {
    fn on_unit_timer_elapsed(&mut self, now: DateTime<Utc>) {
        self.advance_unit(now);
    }
}

fn fresh_state(routine: &Routine, settings: &SessionSettings) -> ProgressionState {
    let mut state = ProgressionState::new(routine);
    state.timer = UnitTimer::new(settings.go_hold_ms);
    if let Some(seconds) = routine.step(0).timer_seconds() {
        state.timer.initialize(seconds);
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cues::RecordingCues;
    use crate::motivation::Rewards;
    use crate::routine::{default_plan, LengthOverride};
    use crate::store::MemoryStore;
    use crate::types::{Category, ExerciseStep, Magnitude};
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct CountingMotivator {
        calls: Rc<RefCell<Vec<u32>>>,
    }

    impl Motivator for CountingMotivator {
        fn on_session_complete(&mut self, exercise_count: u32) -> Rewards {
            self.calls.borrow_mut().push(exercise_count);
            Rewards {
                total_sessions: self.calls.borrow().len() as u32,
                ..Rewards::default()
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingRenderer {
        views: Rc<RefCell<Vec<SessionView>>>,
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, view: &SessionView) {
            self.views.borrow_mut().push(view.clone());
        }
    }

    struct Harness {
        session: Session,
        store: MemoryStore,
        motivator: CountingMotivator,
        cues: RecordingCues,
        renders: RecordingRenderer,
        clock: DateTime<Utc>,
    }

    impl Harness {
        fn with_plan(plan: RoutinePlan, length: WorkoutLength) -> Self {
            crate::logging::init_test();
            let store = MemoryStore::new();
            Self::with_store(plan, length, store)
        }

        fn with_store(plan: RoutinePlan, length: WorkoutLength, store: MemoryStore) -> Self {
            let motivator = CountingMotivator::default();
            let cues = RecordingCues::default();
            let renders = RecordingRenderer::default();
            let session = Session::new(
                plan,
                length,
                SessionSettings::default(),
                Collaborators {
                    store: Box::new(store.clone()),
                    motivator: Box::new(motivator.clone()),
                    cues: Box::new(cues.clone()),
                    renderer: Box::new(renders.clone()),
                },
            );
            Self {
                session,
                store,
                motivator,
                cues,
                renders,
                clock: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            }
        }

        fn builtin(length: WorkoutLength) -> Self {
            Self::with_plan(default_plan().clone(), length)
        }

        fn advance_clock(&mut self, ms: i64) {
            let end = self.clock + Duration::milliseconds(ms);
            while self.clock < end {
                self.clock += Duration::milliseconds(250);
                self.session.tick(self.clock);
            }
        }

        /// Tick until the session needs a command.
        fn run_timers(&mut self) {
            let mut guard = 0;
            while self.session.timer_active() && guard < 100_000 {
                self.advance_clock(250);
                guard += 1;
            }
        }

        fn primary(&mut self) {
            self.session.primary_action(self.clock);
        }

        fn ready(&mut self) {
            self.session.ready_after_rest(self.clock);
        }

        fn skip(&mut self) {
            self.session.skip(self.clock);
        }

        fn check(&self) {
            self.session
                .state()
                .check_invariants(self.session.routine(), self.session.completed())
                .unwrap();
        }

        /// Do whatever moves the session on by one: leave a rest, run a
        /// timed unit out, or finish an untimed one.
        fn step_forward(&mut self) {
            if self.session.is_rest_gate_open() {
                self.ready();
                return;
            }
            if self.session.routine().step(self.session.state().step_index).is_timed() {
                if self.session.state().timer_phase() == TimerPhase::Paused {
                    self.session.resume(self.clock);
                } else if !self.session.timer_active() {
                    self.primary();
                }
                let unit = self.session.state().unit();
                while self.session.state().unit() == unit
                    && !self.session.is_rest_gate_open()
                    && !self.session.is_finished()
                {
                    self.advance_clock(250);
                }
            } else {
                self.primary();
            }
        }
    }

    fn plan_of(steps: Vec<ExerciseStep>) -> RoutinePlan {
        RoutinePlan {
            base: Routine::new(steps).unwrap(),
            short_overrides: Vec::<LengthOverride>::new(),
        }
    }

    fn step(name: &str, category: Category, sets: u32, per_side: bool, magnitude: Magnitude) -> ExerciseStep {
        ExerciseStep {
            name: name.into(),
            category,
            set_count: sets,
            per_side,
            magnitude,
            purpose: String::new(),
            instructions: String::new(),
            image: None,
        }
    }

    #[test]
    fn test_new_session_is_not_started() {
        let h = Harness::builtin(WorkoutLength::Long);
        let view = h.session.view();
        assert!(!view.started);
        assert_eq!(view.step_number, 1);
        assert_eq!(view.side, Side::Right);
        assert_eq!(view.seconds_remaining, 30);
        assert!(!view.can_go_back);
        assert!(h.session.saved_snapshot().is_none());
    }

    #[test]
    fn test_strength_two_sets_scenario() {
        let plan = plan_of(vec![step(
            "Squats",
            Category::Strength,
            2,
            false,
            Magnitude::Reps { reps: 10 },
        )]);
        let mut h = Harness::with_plan(plan, WorkoutLength::Long);

        h.primary();
        assert!(h.session.state().started);

        h.primary();
        assert_eq!(h.session.rest_message(), Some("Up next: Set 2"));
        assert_eq!(h.session.state().set_index, 0);

        h.ready();
        assert!(!h.session.is_rest_gate_open());
        assert_eq!(h.session.state().set_index, 1);

        h.primary();
        assert!(h.session.is_finished());
        assert!(!h.session.is_rest_gate_open());
        assert_eq!(*h.motivator.calls.borrow(), vec![1]);
        assert_eq!(h.session.completion().unwrap().exercise_count, 1);
        assert_eq!(h.cues.count(Cue::Celebrate), 1);
    }

    #[test]
    fn test_timed_per_side_scenario() {
        let plan = plan_of(vec![step(
            "Stand",
            Category::Balance,
            1,
            true,
            Magnitude::Timed { seconds: 30 },
        )]);
        let mut h = Harness::with_plan(plan, WorkoutLength::Long);

        h.primary();
        assert_eq!(h.session.state().timer_phase(), TimerPhase::CountingDown);
        assert_eq!(h.session.view().countdown.as_deref(), Some("3"));

        h.advance_clock(1000);
        assert_eq!(h.session.view().countdown.as_deref(), Some("2"));
        h.advance_clock(1000);
        assert_eq!(h.session.view().countdown.as_deref(), Some("1"));
        h.advance_clock(1000);
        assert_eq!(h.session.view().countdown.as_deref(), Some("Go!"));
        h.advance_clock(500);
        assert_eq!(h.session.state().timer_phase(), TimerPhase::Running);
        assert_eq!(h.session.state().seconds_remaining(), 30);

        h.advance_clock(30_000);
        assert_eq!(h.session.state().side, Side::Left);
        assert_eq!(h.session.state().seconds_remaining(), 30);
        // Left starts after the short switch delay, without a countdown.
        assert!(h.session.timer_active());
        h.advance_clock(500);
        assert_eq!(h.session.state().timer_phase(), TimerPhase::Running);

        h.advance_clock(30_000);
        assert!(h.session.is_finished());
        assert_eq!(*h.motivator.calls.borrow(), vec![1]);
        // Three beats and "Go", then three warnings per side.
        assert_eq!(h.cues.count(Cue::Beep), 1 + 4 + 6);
        assert_eq!(h.cues.count(Cue::UnitDone), 2);
    }

    #[test]
    fn test_total_traversal_matches_unit_count() {
        for length in [WorkoutLength::Long, WorkoutLength::Short] {
            let mut h = Harness::builtin(length);
            let expected = h.session.routine().total_units();

            h.session.start(h.clock);
            let mut units = 0;
            while !h.session.is_finished() {
                let before = h.session.state().unit();
                h.step_forward();
                h.check();
                if h.session.state().unit() != before || h.session.is_finished() {
                    units += 1;
                }
                assert!(units <= expected, "walked past the end of the routine");
            }
            assert_eq!(units, expected, "{} routine", length);
            assert_eq!(h.motivator.calls.borrow().len(), 1);
        }
    }

    #[test]
    fn test_forward_back_symmetry() {
        let mut h = Harness::builtin(WorkoutLength::Short);
        h.session.start(h.clock);

        let mut visited = vec![h.session.state().unit()];
        while !h.session.is_finished() {
            h.step_forward();
            let unit = h.session.state().unit();
            if !h.session.is_finished() && visited.last() != Some(&unit) {
                visited.push(unit);
            }
        }

        // Replay the walk, stepping back once from each unit.
        let mut h = Harness::builtin(WorkoutLength::Short);
        h.session.start(h.clock);
        for pair in visited.windows(2) {
            while h.session.state().unit() != pair[1] {
                h.step_forward();
            }
            h.session.back();
            assert_eq!(h.session.state().unit(), pair[0]);
            assert!(!h.session.completed().contains(pair[0].step_index));
            assert_eq!(h.session.state().timer_phase(), TimerPhase::Idle);
            h.check();
            h.step_forward();
        }
    }

    #[test]
    fn test_rest_gate_only_for_strength_boundaries() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.session.start(h.clock);
        h.run_timers();

        while !h.session.is_finished() {
            let before = h.session.state().unit();
            let step = h.session.routine().step(before.step_index).clone();
            let was_last_unit = h.session.state().is_at_end(h.session.routine());
            let at_boundary = step.last_side() == before.side;
            let resting = h.session.is_rest_gate_open();

            h.step_forward();
            if resting {
                continue;
            }
            if h.session.is_rest_gate_open() {
                assert_eq!(step.category, Category::Strength);
                assert!(at_boundary);
                assert!(!was_last_unit);
            } else if at_boundary
                && step.category == Category::Strength
                && !h.session.is_finished()
            {
                panic!("expected a rest gate after {:?}", before);
            }
        }
        assert!(!h.session.is_rest_gate_open());
    }

    #[test]
    fn test_gate_blocks_everything_but_ready_and_restart() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.session.start(h.clock);
        h.run_timers();
        // Heel walking, set 1.
        assert_eq!(h.session.state().step_index, 2);
        h.primary();
        assert!(h.session.is_rest_gate_open());
        let unit = h.session.state().unit();

        h.primary();
        h.session.back();
        h.skip();
        h.session.tally_rep();
        h.session.pause();
        assert!(h.session.is_rest_gate_open());
        assert_eq!(h.session.state().unit(), unit);

        h.session.restart(true);
        assert!(!h.session.is_rest_gate_open());
        assert!(!h.session.state().started);
    }

    #[test]
    fn test_skip_strength_opens_gate_then_lands_on_next_step() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.session.start(h.clock);
        h.run_timers();
        assert_eq!(h.session.state().step_index, 2);

        h.skip();
        h.check();
        assert_eq!(h.session.rest_message(), Some("Up next: Resistance Band Dorsiflexion"));
        assert!(h.session.completed().contains(2));
        assert_eq!(h.session.state().step_index, 2);

        h.ready();
        h.check();
        assert_eq!(h.session.state().step_index, 3);
        assert_eq!(h.session.state().set_index, 0);
        assert_eq!(h.session.state().side, Side::Right);
    }

    #[test]
    fn test_skip_timed_step_does_not_auto_start() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.session.start(h.clock);
        h.skip();
        h.check();

        assert_eq!(h.session.state().step_index, 1);
        assert_eq!(h.session.state().timer_phase(), TimerPhase::Idle);
        assert_eq!(h.session.state().seconds_remaining(), 30);
        assert!(!h.session.timer_active());
        assert!(h.session.completed().contains(0));
    }

    #[test]
    fn test_skip_last_step_stays_in_place() {
        let mut h = Harness::builtin(WorkoutLength::Short);
        h.session.start(h.clock);
        while h.session.state().step_index < h.session.routine().last_index() {
            if h.session.is_rest_gate_open() {
                h.ready();
            }
            h.skip();
            h.check();
        }
        let last = h.session.routine().last_index();
        h.skip();
        h.check();
        assert_eq!(h.session.state().step_index, last);
        assert!(h.session.completed().contains(last));
        assert!(!h.session.is_finished());
        assert_eq!(h.session.completed().len(), h.session.routine().len());
    }

    #[test]
    fn test_back_at_beginning_is_noop() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.session.start(h.clock);
        let before = h.session.state().unit();
        h.session.back();
        assert_eq!(h.session.state().unit(), before);
    }

    #[test]
    fn test_back_stops_running_timer() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.session.start(h.clock);
        h.advance_clock(3500 + 30_000 + 500 + 5000);
        assert_eq!(h.session.state().side, Side::Left);
        assert_eq!(h.session.state().timer_phase(), TimerPhase::Running);

        h.session.back();
        assert_eq!(h.session.state().side, Side::Right);
        assert_eq!(h.session.state().set_index, 0);
        assert_eq!(h.session.state().timer_phase(), TimerPhase::Idle);
        assert_eq!(h.session.state().seconds_remaining(), 30);
        assert!(!h.session.timer_active());
    }

    #[test]
    fn test_back_across_step_boundary_uncompletes() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.session.start(h.clock);
        h.run_timers();
        assert_eq!(h.session.state().step_index, 2);
        assert!(h.session.completed().contains(1));

        h.session.back();
        assert_eq!(h.session.state().step_index, 1);
        assert_eq!(h.session.state().set_index, 2);
        assert_eq!(h.session.state().side, Side::Left);
        assert!(!h.session.completed().contains(1));
        assert!(h.session.completed().contains(0));
    }

    #[test]
    fn test_primary_toggles_pause_on_running_timer() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.primary();
        // Pressing during the countdown does nothing.
        h.advance_clock(1000);
        h.primary();
        assert_eq!(h.session.state().timer_phase(), TimerPhase::CountingDown);

        h.advance_clock(2500 + 4000);
        assert_eq!(h.session.state().seconds_remaining(), 26);
        h.primary();
        assert_eq!(h.session.state().timer_phase(), TimerPhase::Paused);

        h.advance_clock(60_000);
        assert_eq!(h.session.state().seconds_remaining(), 26);
        h.primary();
        assert_eq!(h.session.state().timer_phase(), TimerPhase::Running);
        h.advance_clock(1000);
        assert_eq!(h.session.state().seconds_remaining(), 25);
    }

    #[test]
    fn test_idle_timed_step_runs_fresh_countdown() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.session.start(h.clock);
        h.skip();
        assert_eq!(h.session.state().timer_phase(), TimerPhase::Idle);

        h.primary();
        assert_eq!(h.session.state().timer_phase(), TimerPhase::CountingDown);
        assert_eq!(h.session.view().countdown.as_deref(), Some("3"));
    }

    #[test]
    fn test_tally_is_capped_and_reset_per_unit() {
        let mut h = Harness::builtin(WorkoutLength::Short);
        h.session.start(h.clock);
        h.run_timers();
        // Heel walking, 5 steps.
        for _ in 0..8 {
            h.session.tally_rep();
        }
        assert_eq!(h.session.state().rep_count, 5);

        h.primary();
        h.ready();
        assert_eq!(h.session.state().rep_count, 0);
    }

    #[test]
    fn test_select_length_only_before_start() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.session.select_workout_length(WorkoutLength::Short);
        assert_eq!(h.session.workout_length(), WorkoutLength::Short);
        assert_eq!(h.session.routine().step(0).set_count, 2);

        h.session.start(h.clock);
        h.session.select_workout_length(WorkoutLength::Long);
        assert_eq!(h.session.workout_length(), WorkoutLength::Short);
    }

    #[test]
    fn test_unconfirmed_restart_is_noop() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.session.start(h.clock);
        h.skip();
        h.session.restart(false);
        assert_eq!(h.session.state().step_index, 1);
        assert!(h.store.contains(&session_key()));

        h.session.restart(true);
        assert_eq!(h.session.state().step_index, 0);
        assert!(h.session.completed().is_empty());
        assert!(!h.store.contains(&session_key()));
        h.check();
    }

    #[test]
    fn test_every_mutation_renders_and_saves() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        assert!(!h.store.contains(&session_key()));

        h.session.start(h.clock);
        assert!(h.store.contains(&session_key()));
        let renders = h.renders.views.borrow().len();

        h.skip();
        assert_eq!(h.renders.views.borrow().len(), renders + 1);
        let saved = h.session.saved_snapshot().unwrap();
        assert_eq!(saved.step_index, 1);
        assert!(saved.completed_steps.contains(0));
    }

    #[test]
    fn test_resume_restores_paused_timer() {
        let mut h = Harness::builtin(WorkoutLength::Short);
        h.session.start(h.clock);
        h.advance_clock(3500 + 10_000);
        assert_eq!(h.session.state().seconds_remaining(), 20);

        let mut resumed = Harness::with_store(default_plan().clone(), WorkoutLength::Long, h.store.clone());
        assert!(resumed.session.resume_saved());
        assert_eq!(resumed.session.workout_length(), WorkoutLength::Short);
        assert_eq!(resumed.session.state().timer_phase(), TimerPhase::Paused);
        assert_eq!(resumed.session.state().seconds_remaining(), 20);
        assert!(!resumed.session.timer_active());

        resumed.primary();
        assert_eq!(resumed.session.state().timer_phase(), TimerPhase::Running);
    }

    #[test]
    fn test_resume_reopens_rest_gate() {
        let mut h = Harness::builtin(WorkoutLength::Long);
        h.session.start(h.clock);
        h.run_timers();
        h.primary();
        assert!(h.session.is_rest_gate_open());

        let mut resumed = Harness::with_store(default_plan().clone(), WorkoutLength::Long, h.store.clone());
        assert!(resumed.session.resume_saved());
        assert_eq!(resumed.session.rest_message(), Some("Up next: Set 2"));

        resumed.ready();
        assert_eq!(resumed.session.state().set_index, 1);
    }

    #[test]
    fn test_resume_ignores_garbage() {
        let store = MemoryStore::new();
        store.insert_raw(&session_key(), "{ not json");
        let mut h = Harness::with_store(default_plan().clone(), WorkoutLength::Long, store);
        assert!(!h.session.resume_saved());
        assert!(!h.session.state().started);
    }

    #[test]
    fn test_unfitting_snapshot_is_dropped() {
        let store = MemoryStore::new();
        store.insert_raw(
            &session_key(),
            r#"{"step_index": 99, "set_index": 0, "side": "none", "started": true}"#,
        );
        let mut h = Harness::with_store(default_plan().clone(), WorkoutLength::Long, store);
        assert!(!h.session.resume_saved());
        assert!(!h.store.contains(&session_key()));
    }

    #[test]
    fn test_completion_clears_snapshot_and_freezes() {
        let plan = plan_of(vec![step("Walk", Category::Gait, 1, false, Magnitude::Steps { steps: 10 })]);
        let mut h = Harness::with_plan(plan, WorkoutLength::Long);
        h.primary();
        assert!(h.store.contains(&session_key()));

        h.advance_clock(90_000);
        h.skip();
        h.primary();
        assert!(h.session.is_finished());
        assert!(!h.store.contains(&session_key()));
        let summary = h.session.completion().unwrap();
        assert_eq!(summary.duration_seconds, 90);
        assert_eq!(summary.skipped_steps, vec![0]);

        h.primary();
        h.session.back();
        assert_eq!(h.motivator.calls.borrow().len(), 1);
        assert!(h.session.view().is_finished());
    }

    #[test]
    fn test_unavailable_store_does_not_break_session() {
        crate::logging::init_test();
        let mut h = Harness::with_store(
            default_plan().clone(),
            WorkoutLength::Long,
            MemoryStore::unavailable(),
        );
        h.session.start(h.clock);
        h.skip();
        assert_eq!(h.session.state().step_index, 1);
        assert!(h.session.saved_snapshot().is_none());
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut a = Harness::builtin(WorkoutLength::Long);
        let b = Harness::builtin(WorkoutLength::Long);
        a.session.start(a.clock);
        a.skip();
        assert_eq!(a.session.state().step_index, 1);
        assert_eq!(b.session.state().step_index, 0);
        assert!(!b.session.state().started);
    }
}
