//! Read-only picture of a session for the presentation layer.

use crate::motivation::Rewards;
use crate::types::{Category, Mode, Side, TimerPhase, WorkoutLength};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of a finished routine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub workout_length: WorkoutLength,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub exercise_count: u32,
    /// Indices of the steps that were skipped rather than done
    pub skipped_steps: Vec<usize>,
    pub rewards: Rewards,
}

/// Everything a renderer needs to draw the current screen
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
    pub workout_length: WorkoutLength,
    pub started: bool,
    /// 1-based
    pub step_number: usize,
    pub step_count: usize,
    pub name: String,
    pub category: Category,
    pub mode: Mode,
    pub purpose: String,
    pub instructions: String,
    pub image: Option<String>,
    pub metric_label: String,
    /// 1-based
    pub set_number: u32,
    pub set_count: u32,
    pub side: Side,
    pub timer_phase: TimerPhase,
    pub seconds_remaining: u32,
    /// "3", "2", "1" or "Go!" while counting down
    pub countdown: Option<String>,
    pub rep_count: u32,
    /// Target for the rep tally on untimed steps
    pub rep_target: Option<u32>,
    pub rest_message: Option<String>,
    pub completed_steps: Vec<usize>,
    pub percent_complete: u32,
    pub can_go_back: bool,
    pub completion: Option<CompletionSummary>,
}

impl SessionView {
    pub fn is_resting(&self) -> bool {
        self.rest_message.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.completion.is_some()
    }

    /// "Set 2 of 3 · Left" style position line.
    pub fn position_label(&self) -> String {
        match self.side {
            Side::None => format!("Set {} of {}", self.set_number, self.set_count),
            side => format!("Set {} of {} · {}", self.set_number, self.set_count, side),
        }
    }
}

/// Outbound port: called after every mutation
pub trait Renderer {
    fn render(&mut self, view: &SessionView);
}

/// Renderer that draws nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _view: &SessionView) {}
}
