use chrono::{DateTime, Local, NaiveDate, TimeDelta};

pub type EntryId = String;

/// A persisted block of time logged against a category.
///
/// Timestamps are `None` when the stored text could not be parsed; such
/// entries are skipped by every day-bucketing computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TimeEntry {
    pub id: EntryId,
    pub started_at: Option<DateTime<Local>>,
    pub stopped_at: Option<DateTime<Local>>,
    pub duration_ms: u64,
    pub category: String,
}

/// A time entry that has not been persisted yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TimeEntryDraft {
    pub started_at: DateTime<Local>,
    pub stopped_at: DateTime<Local>,
    pub duration_ms: u64,
    pub category: String,
}

impl TimeEntryDraft {
    /// A draft of `duration_ms` that ends at `stopped_at`, or `None` when the
    /// start would fall outside the representable range.
    pub fn ending_at(
        category: &str,
        duration_ms: u64,
        stopped_at: DateTime<Local>,
    ) -> Option<Self> {
        let span = TimeDelta::try_milliseconds(i64::try_from(duration_ms).ok()?)?;
        Some(Self {
            started_at: stopped_at.checked_sub_signed(span)?,
            stopped_at,
            duration_ms,
            category: category.trim().to_string(),
        })
    }
}

impl TimeEntry {
    /// Builds the stored form of `draft` under an existing id.
    pub fn from_draft(id: EntryId, draft: TimeEntryDraft) -> Self {
        Self {
            id,
            started_at: Some(draft.started_at),
            stopped_at: Some(draft.stopped_at),
            duration_ms: draft.duration_ms,
            category: draft.category,
        }
    }

    /// Start and stop when both parsed and correctly ordered.
    pub fn span(&self) -> Option<(DateTime<Local>, DateTime<Local>)> {
        match (self.started_at, self.stopped_at) {
            (Some(start), Some(stop)) if stop > start => Some((start, stop)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CategoryTotal {
    pub category: String,
    pub duration_ms: u64,
}

/// Aggregated totals for a single logical day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DayTotals {
    pub day: NaiveDate,
    pub totals: Vec<CategoryTotal>,
    pub grand_total_ms: u64,
}
