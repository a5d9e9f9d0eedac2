/// Time entry queries.
use anyhow::{Context, Result};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::{Connection, Row};

use crate::store::EntryStore;
use crate::types::{TimeEntry, TimeEntryDraft};

impl EntryStore for Connection {
    fn list_entries(&self) -> Vec<TimeEntry> {
        match query_entries(self) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read entries, treating store as empty");
                Vec::new()
            }
        }
    }

    fn add_entry(&self, draft: TimeEntryDraft) -> Result<TimeEntry> {
        let duration_ms = stored_duration(draft.duration_ms)?;
        let entry = TimeEntry::from_draft(
            uuid::Uuid::new_v4().to_string(),
            TimeEntryDraft {
                category: draft.category.trim().to_string(),
                ..draft
            },
        );
        self.execute(
            "INSERT INTO entries (id, started_at, stopped_at, duration_ms, category)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                entry.id,
                entry.started_at.map(format_timestamp),
                entry.stopped_at.map(format_timestamp),
                duration_ms,
                entry.category,
            ],
        )?;
        tracing::info!(
            id = %entry.id,
            category = %entry.category,
            duration_ms = entry.duration_ms,
            "entry added"
        );
        Ok(entry)
    }

    fn update_entry(&self, entry: &TimeEntry) -> Result<()> {
        let duration_ms = stored_duration(entry.duration_ms)?;
        let changed = self.execute(
            "UPDATE entries
             SET started_at = COALESCE(?1, started_at),
                 stopped_at = COALESCE(?2, stopped_at),
                 duration_ms = ?3,
                 category = ?4
             WHERE id = ?5",
            rusqlite::params![
                entry.started_at.map(format_timestamp),
                entry.stopped_at.map(format_timestamp),
                duration_ms,
                entry.category.trim(),
                entry.id,
            ],
        )?;
        tracing::debug!(id = %entry.id, changed, "entry update");
        Ok(())
    }

    fn delete_entry(&self, id: &str) -> Result<()> {
        let changed = self.execute("DELETE FROM entries WHERE id = ?1", [id])?;
        tracing::debug!(id, changed, "entry delete");
        Ok(())
    }
}

fn query_entries(conn: &Connection) -> Result<Vec<TimeEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, started_at, stopped_at, duration_ms, category FROM entries
         ORDER BY stopped_at DESC",
    )?;
    let rows = stmt.query_map([], entry_from_row)?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

/// Entries whose id starts with `prefix`.
pub fn query_entries_by_id_prefix(prefix: &str, conn: &Connection) -> Result<Vec<TimeEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, started_at, stopped_at, duration_ms, category FROM entries
         WHERE substr(id, 1, length(?1)) = ?1",
    )?;
    let rows = stmt.query_map([prefix], entry_from_row)?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<TimeEntry> {
    let duration_ms = row.get_ref(3)?.as_i64().unwrap_or(0).max(0) as u64;
    Ok(TimeEntry {
        id: row.get(0)?,
        started_at: parse_timestamp(row.get_ref(1)?.as_str().ok()),
        stopped_at: parse_timestamp(row.get_ref(2)?.as_str().ok()),
        duration_ms,
        category: row.get_ref(4)?.as_str().unwrap_or_default().to_string(),
    })
}

fn stored_duration(duration_ms: u64) -> Result<i64> {
    i64::try_from(duration_ms)
        .with_context(|| format!("duration {duration_ms} ms is too large to store"))
}

fn format_timestamp(dt: DateTime<Local>) -> String {
    dt.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Local>> {
    value.and_then(|raw| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Local))
    })
}
