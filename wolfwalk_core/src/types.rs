//! Core domain types for Wolfwalk.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercise steps and their categories/modes
//! - Cursor primitives (side, timer phase)
//! - Workout length variants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Exercise Types
// ============================================================================

/// Category of an exercise step
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Stretch,
    Strength,
    Gait,
    Balance,
    Fun,
}

impl Category {
    /// Whether a rest gate is shown between sets and after the last set.
    pub fn rests_between_sets(self) -> bool {
        matches!(self, Category::Strength)
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Stretch => "Stretch",
            Category::Strength => "Strength",
            Category::Gait => "Gait",
            Category::Balance => "Balance",
            Category::Fun => "Fun",
        }
    }
}

/// How a unit of work is measured
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Timed,
    Reps,
    Steps,
}

/// Mode-specific amount of work for one unit.
///
/// The variant is the mode, so a step can never carry a magnitude that
/// disagrees with it. Whether the amount is per side or total is decided by
/// [`ExerciseStep::per_side`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Magnitude {
    Timed { seconds: u32 },
    Reps { reps: u32 },
    Steps { steps: u32 },
}

impl Magnitude {
    pub fn mode(&self) -> Mode {
        match self {
            Magnitude::Timed { .. } => Mode::Timed,
            Magnitude::Reps { .. } => Mode::Reps,
            Magnitude::Steps { .. } => Mode::Steps,
        }
    }

    pub fn amount(&self) -> u32 {
        match *self {
            Magnitude::Timed { seconds } => seconds,
            Magnitude::Reps { reps } => reps,
            Magnitude::Steps { steps } => steps,
        }
    }

    /// Same mode, different amount.
    pub fn with_amount(self, amount: u32) -> Self {
        match self {
            Magnitude::Timed { .. } => Magnitude::Timed { seconds: amount },
            Magnitude::Reps { .. } => Magnitude::Reps { reps: amount },
            Magnitude::Steps { .. } => Magnitude::Steps { steps: amount },
        }
    }
}

/// One exercise of a routine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseStep {
    pub name: String,
    pub category: Category,
    #[serde(rename = "sets")]
    pub set_count: u32,
    #[serde(default)]
    pub per_side: bool,
    #[serde(flatten)]
    pub magnitude: Magnitude,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl ExerciseStep {
    pub fn mode(&self) -> Mode {
        self.magnitude.mode()
    }

    pub fn is_timed(&self) -> bool {
        self.mode() == Mode::Timed
    }

    /// Seconds for one run of the timer (per side or total).
    pub fn timer_seconds(&self) -> Option<u32> {
        match self.magnitude {
            Magnitude::Timed { seconds } => Some(seconds),
            _ => None,
        }
    }

    /// Side a set starts on.
    pub fn first_side(&self) -> Side {
        if self.per_side {
            Side::Right
        } else {
            Side::None
        }
    }

    /// Side a set ends on.
    pub fn last_side(&self) -> Side {
        if self.per_side {
            Side::Left
        } else {
            Side::None
        }
    }

    pub fn last_set_index(&self) -> u32 {
        self.set_count.saturating_sub(1)
    }

    /// Number of units (set × side) this step is made of.
    pub fn unit_count(&self) -> u32 {
        self.set_count * if self.per_side { 2 } else { 1 }
    }

    /// Human readable amount, e.g. `00:30 per side` or `15 reps per side`.
    pub fn metric_label(&self) -> String {
        let suffix = if self.per_side { " per side" } else { "" };
        match self.magnitude {
            Magnitude::Timed { seconds } => format!("{}{}", format_clock(seconds), suffix),
            Magnitude::Reps { reps } => format!("{} reps{}", reps, suffix),
            Magnitude::Steps { steps } => format!("{} steps{}", steps, suffix),
        }
    }
}

// ============================================================================
// Cursor Types
// ============================================================================

/// Which side of the body the current unit works
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    None,
    Right,
    Left,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::None => write!(f, "-"),
            Side::Right => write!(f, "Right"),
            Side::Left => write!(f, "Left"),
        }
    }
}

/// Phase of the unit timer
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    #[default]
    Idle,
    CountingDown,
    Running,
    Paused,
}

/// Routine variant chosen before a session starts
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutLength {
    #[default]
    Long,
    Short,
}

impl fmt::Display for WorkoutLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkoutLength::Long => write!(f, "long"),
            WorkoutLength::Short => write!(f, "short"),
        }
    }
}

impl FromStr for WorkoutLength {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(WorkoutLength::Long),
            "short" => Ok(WorkoutLength::Short),
            other => Err(crate::Error::Config(format!(
                "Unknown workout length '{}' (expected 'long' or 'short')",
                other
            ))),
        }
    }
}

/// Format seconds as `MM:SS`.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
