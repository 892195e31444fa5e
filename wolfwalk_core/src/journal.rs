//! Session journal: one JSON line per completed session.
//!
//! Appends take an exclusive file lock so two processes finishing at the
//! same moment cannot interleave their lines.

use crate::types::WorkoutLength;
use crate::view::CompletionSummary;
use crate::Result;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A finished session as written to the journal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub workout_length: WorkoutLength,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub exercise_count: u32,
    #[serde(default)]
    pub skipped_steps: Vec<usize>,
}

impl From<&CompletionSummary> for SessionRecord {
    fn from(summary: &CompletionSummary) -> Self {
        Self {
            id: Uuid::new_v4(),
            workout_length: summary.workout_length,
            started_at: summary.started_at,
            completed_at: summary.completed_at,
            duration_seconds: summary.duration_seconds,
            exercise_count: summary.exercise_count,
            skipped_steps: summary.skipped_steps.clone(),
        }
    }
}

/// Destination for completed sessions
pub trait SessionSink {
    fn append(&mut self, record: &SessionRecord) -> Result<()>;
}

/// JSONL journal with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl SessionSink for JsonlJournal {
    fn append(&mut self, record: &SessionRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended session {} to journal", record.id);
        Ok(())
    }
}

/// Read every record from a journal, skipping lines that do not parse.
pub fn read_records(path: &Path) -> Result<Vec<SessionRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SessionRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Failed to parse journal line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} records from journal", records.len());
    Ok(records)
}
