//! CSV export of the session journal.

use crate::journal::{read_records, SessionRecord};
use crate::Result;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    workout_length: String,
    started_at: String,
    completed_at: String,
    duration_seconds: i64,
    exercise_count: u32,
    skipped_steps: String,
}

impl From<&SessionRecord> for CsvRow {
    fn from(record: &SessionRecord) -> Self {
        CsvRow {
            id: record.id.to_string(),
            workout_length: record.workout_length.to_string(),
            started_at: record.started_at.to_rfc3339(),
            completed_at: record.completed_at.to_rfc3339(),
            duration_seconds: record.duration_seconds,
            exercise_count: record.exercise_count,
            skipped_steps: record
                .skipped_steps
                .iter()
                .map(|i| (i + 1).to_string())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Append journal records not yet in `csv_path` and return how many were written.
///
/// Rows are matched on the `id` column, so exporting again only adds sessions
/// finished since the last export. The header row is written only when the CSV
/// file is new or empty. The journal itself is left untouched.
pub fn export_csv(journal_path: &Path, csv_path: &Path) -> Result<usize> {
    let records = read_records(journal_path)?;
    if records.is_empty() {
        tracing::info!("No sessions in journal to export");
        return Ok(0);
    }

    let exported = exported_ids(csv_path)?;
    let fresh: Vec<&SessionRecord> = records
        .iter()
        .filter(|r| !exported.contains(&r.id.to_string()))
        .collect();
    if fresh.is_empty() {
        tracing::info!("All {} sessions already exported to {:?}", records.len(), csv_path);
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for record in &fresh {
        writer.serialize(CsvRow::from(*record))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} sessions to {:?}", fresh.len(), csv_path);
    Ok(fresh.len())
}

/// Ids already present in an existing CSV export
fn exported_ids(csv_path: &Path) -> Result<HashSet<String>> {
    let mut ids = HashSet::new();
    if !csv_path.exists() || std::fs::metadata(csv_path)?.len() == 0 {
        return Ok(ids);
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    for row in reader.records() {
        if let Some(id) = row?.get(0) {
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}
