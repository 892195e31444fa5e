#![forbid(unsafe_code)]

//! Core domain model and progression engine for Wolfwalk, a guided
//! exercise routine for children.
//!
//! This crate provides:
//! - Domain types (exercise steps, sides, timer phases, workout lengths)
//! - The built-in routine and custom routine loading
//! - The progression state machine, unit timer and rest gate
//! - Snapshot persistence for resuming a session
//! - Motivation rewards (streaks, badges, stickers, chapters)
//! - The completed-session journal and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod routine;
pub mod progression;
pub mod timer;
pub mod rest_gate;
pub mod cues;
pub mod store;
pub mod snapshot;
pub mod view;
pub mod motivation;
pub mod session;
pub mod journal;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use routine::{default_plan, Routine, RoutinePlan};
pub use progression::{CompletedSet, ProgressionState, Unit};
pub use timer::{TimerSignal, UnitTimer, UnitTimerObserver};
pub use rest_gate::{PendingAdvance, RestGate};
pub use cues::{Cue, CueSink, LogCues};
pub use store::{FileStore, MemoryStore, SnapshotStore};
pub use snapshot::Snapshot;
pub use view::{CompletionSummary, NullRenderer, Renderer, SessionView};
pub use motivation::{MotivationState, MotivationTracker, Motivator, Rewards};
pub use session::{Collaborators, Session, SessionSettings};
pub use journal::{read_records, JsonlJournal, SessionRecord, SessionSink};
pub use export::export_csv;
