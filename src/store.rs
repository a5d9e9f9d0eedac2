/// Persistence seams the accounting engine and the timer depend on.
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::types::{TimeEntry, TimeEntryDraft};

/// Durable collection of time entries.
pub trait EntryStore {
    /// All entries, in no particular order. Unreadable storage yields an
    /// empty list instead of an error.
    fn list_entries(&self) -> Vec<TimeEntry>;
    /// Persists `draft` under a fresh id with its category trimmed.
    fn add_entry(&self, draft: TimeEntryDraft) -> Result<TimeEntry>;
    /// Replaces the entry with the same id. No-op when absent.
    fn update_entry(&self, entry: &TimeEntry) -> Result<()>;
    /// No-op when absent.
    fn delete_entry(&self, id: &str) -> Result<()>;
}

/// Durable slot for the single in-progress timer session.
pub trait SessionStore {
    /// The persisted snapshot, or `None` when absent or unreadable.
    fn load_session(&self) -> Option<TimerSnapshot>;
    fn save_session(&self, snapshot: &TimerSnapshot) -> Result<()>;
    fn clear_session(&self) -> Result<()>;
}

/// Serialized form of a timer session. Timestamps are wall-clock epoch
/// milliseconds because monotonic readings do not survive a restart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub accumulated_ms: u64,
    pub is_running: bool,
    pub is_paused: bool,
    pub started_at_ms: i64,
    pub last_resume_time_ms: Option<i64>,
}
