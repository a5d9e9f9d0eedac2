/// Synthetic entry for unlogged time.
///
/// Everything between the daily baseline and now that no logged entry
/// covers is represented by one auto entry per logical day. The entry is
/// recomputed from the current ledger on every call rather than patched, so
/// repeated calls converge and stale or duplicate copies are cleaned up.
use anyhow::Result;
use chrono::{DateTime, Local, TimeDelta};

use crate::calendar::{
    logical_date, logical_day_end, logical_day_start, resolve_local, truncate_to_millis,
};
use crate::caps::is_auto_category;
use crate::config::Config;
use crate::store::EntryStore;
use crate::types::{TimeEntry, TimeEntryDraft};

/// What a reconciliation pass changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub unlogged_ms: u64,
    pub created: bool,
    pub updated: bool,
    pub deleted: usize,
}

impl Reconciliation {
    pub fn changed(&self) -> bool {
        self.created || self.updated || self.deleted > 0
    }
}

/// Baseline instant on the logical day of `now`.
pub fn baseline_start(now: DateTime<Local>, config: &Config) -> DateTime<Local> {
    let date = logical_date(&now, config.day_boundary_hour);
    resolve_local(&Local, date.and_time(config.baseline))
}

/// Milliseconds since the baseline (or the day start, whichever is later)
/// not covered by any non-auto entry.
pub fn unlogged_ms(entries: &[TimeEntry], now: DateTime<Local>, config: &Config) -> u64 {
    let day_start = logical_day_start(&now, config.day_boundary_hour);
    let window_start = day_start.max(baseline_start(now, config));
    if now <= window_start {
        return 0;
    }
    let elapsed_ms = (now - window_start).num_milliseconds().max(0) as u64;
    let logged_ms: u64 = entries
        .iter()
        .filter(|entry| !is_auto_category(&entry.category, config))
        .filter_map(TimeEntry::span)
        .map(|(start, stop)| overlap_ms(start, stop, window_start, now))
        .sum();
    elapsed_ms.saturating_sub(logged_ms)
}

fn overlap_ms(
    start_a: DateTime<Local>,
    end_a: DateTime<Local>,
    start_b: DateTime<Local>,
    end_b: DateTime<Local>,
) -> u64 {
    let start = start_a.max(start_b);
    let end = end_a.min(end_b);
    (end - start).num_milliseconds().max(0) as u64
}

/// Brings today's auto entry in line with `entries` as of `now`.
///
/// `entries` must be the store's current contents.
pub fn reconcile_auto_entry(
    entries: &[TimeEntry],
    now: DateTime<Local>,
    config: &Config,
    store: &impl EntryStore,
) -> Result<Reconciliation> {
    let now = truncate_to_millis(now);
    let day_start = logical_day_start(&now, config.day_boundary_hour);
    let day_end = logical_day_end(&now, config.day_boundary_hour);

    let mut todays_autos: Vec<&TimeEntry> = entries
        .iter()
        .filter(|entry| is_auto_category(&entry.category, config))
        .filter(|entry| {
            entry
                .stopped_at
                .is_some_and(|stopped| stopped >= day_start && stopped < day_end)
        })
        .collect();
    todays_autos.sort_by(|a, b| b.stopped_at.cmp(&a.stopped_at).then_with(|| a.id.cmp(&b.id)));

    let unlogged_ms = unlogged_ms(entries, now, config);
    let mut outcome = Reconciliation {
        unlogged_ms,
        ..Reconciliation::default()
    };

    if unlogged_ms == 0 {
        for stale in &todays_autos {
            store.delete_entry(&stale.id)?;
            outcome.deleted += 1;
        }
        log_outcome(&outcome);
        return Ok(outcome);
    }

    let target = TimeEntryDraft {
        started_at: now - TimeDelta::milliseconds(unlogged_ms as i64),
        stopped_at: now,
        duration_ms: unlogged_ms,
        category: config.auto_category.clone(),
    };

    match todays_autos.split_first() {
        None => {
            store.add_entry(target)?;
            outcome.created = true;
        }
        Some((primary, duplicates)) => {
            let refreshed = TimeEntry::from_draft(primary.id.clone(), target);
            if **primary != refreshed {
                store.update_entry(&refreshed)?;
                outcome.updated = true;
            }
            for duplicate in duplicates {
                store.delete_entry(&duplicate.id)?;
                outcome.deleted += 1;
            }
        }
    }
    log_outcome(&outcome);
    Ok(outcome)
}

fn log_outcome(outcome: &Reconciliation) {
    if outcome.changed() {
        tracing::info!(
            unlogged_ms = outcome.unlogged_ms,
            created = outcome.created,
            updated = outcome.updated,
            deleted = outcome.deleted,
            "auto entry reconciled"
        );
    } else {
        tracing::debug!(unlogged_ms = outcome.unlogged_ms, "auto entry unchanged");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MINUTE: u64 = 60_000;

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 12, hour, minute, 0).unwrap()
    }

    fn draft(category: &str, start: DateTime<Local>, stop: DateTime<Local>) -> TimeEntryDraft {
        TimeEntryDraft {
            started_at: start,
            stopped_at: stop,
            duration_ms: (stop - start).num_milliseconds() as u64,
            category: category.to_string(),
        }
    }

    fn autos(store: &rusqlite::Connection, config: &Config) -> Vec<TimeEntry> {
        store
            .list_entries()
            .into_iter()
            .filter(|entry| is_auto_category(&entry.category, config))
            .collect()
    }

    fn reconcile(store: &rusqlite::Connection, now: DateTime<Local>) -> Reconciliation {
        let config = Config::default();
        reconcile_auto_entry(&store.list_entries(), now, &config, store).unwrap()
    }

    #[test]
    fn creates_entry_for_unlogged_time_since_baseline() {
        let config = Config::default();
        let store = crate::db::init_in_memory().unwrap();
        store.add_entry(draft("Work", at(9, 0), at(9, 20))).unwrap();

        let outcome = reconcile(&store, at(10, 30));

        assert!(outcome.created);
        assert_eq!(outcome.unlogged_ms, 100 * MINUTE);
        let autos = autos(&store, &config);
        assert_eq!(autos.len(), 1);
        assert_eq!(autos[0].category, "Entertainment (Auto)");
        assert_eq!(autos[0].started_at, Some(at(8, 50)));
        assert_eq!(autos[0].stopped_at, Some(at(10, 30)));
        assert_eq!(autos[0].duration_ms, 100 * MINUTE);
    }

    #[test]
    fn second_call_without_changes_is_a_noop() {
        let config = Config::default();
        let store = crate::db::init_in_memory().unwrap();
        store.add_entry(draft("Work", at(9, 0), at(9, 20))).unwrap();
        let now = at(10, 30) + TimeDelta::nanoseconds(987_654);

        reconcile(&store, now);
        let before = autos(&store, &config);
        let outcome = reconcile(&store, now);

        assert!(!outcome.changed());
        assert_eq!(autos(&store, &config), before);
    }

    #[test]
    fn recomputes_when_new_time_is_logged() {
        let config = Config::default();
        let store = crate::db::init_in_memory().unwrap();
        reconcile(&store, at(10, 0));
        let id = autos(&store, &config)[0].id.clone();

        store.add_entry(draft("Work", at(9, 0), at(10, 0))).unwrap();
        let outcome = reconcile(&store, at(10, 30));

        assert!(outcome.updated);
        let autos = autos(&store, &config);
        assert_eq!(autos.len(), 1);
        assert_eq!(autos[0].id, id);
        assert_eq!(autos[0].duration_ms, 60 * MINUTE);
    }

    #[test]
    fn removes_duplicates_keeping_the_latest() {
        let config = Config::default();
        let store = crate::db::init_in_memory().unwrap();
        store
            .add_entry(draft("Entertainment (Auto)", at(8, 30), at(9, 0)))
            .unwrap();
        let latest = store
            .add_entry(draft("entertainment (auto)", at(8, 30), at(9, 30)))
            .unwrap();

        let outcome = reconcile(&store, at(10, 0));

        assert_eq!(outcome.deleted, 1);
        assert!(outcome.updated);
        let autos = autos(&store, &config);
        assert_eq!(autos.len(), 1);
        assert_eq!(autos[0].id, latest.id);
        assert_eq!(autos[0].duration_ms, 90 * MINUTE);
    }

    #[test]
    fn fully_logged_day_clears_auto_entries() {
        let config = Config::default();
        let store = crate::db::init_in_memory().unwrap();
        reconcile(&store, at(9, 0));
        store.add_entry(draft("Work", at(8, 0), at(10, 0))).unwrap();

        let outcome = reconcile(&store, at(10, 0));

        assert_eq!(outcome.unlogged_ms, 0);
        assert_eq!(outcome.deleted, 1);
        assert!(autos(&store, &config).is_empty());
    }

    #[test]
    fn nothing_is_unlogged_before_the_baseline() {
        let config = Config::default();
        let store = crate::db::init_in_memory().unwrap();
        assert_eq!(unlogged_ms(&[], at(8, 0), &config), 0);
        let outcome = reconcile(&store, at(8, 30));
        assert!(!outcome.changed());
        assert!(autos(&store, &config).is_empty());
    }

    #[test]
    fn late_night_counts_against_the_previous_logical_day() {
        let config = Config::default();
        let now = at(1, 0);
        let entries = vec![TimeEntry::from_draft(
            "x".to_string(),
            draft("Work", at(0, 0), at(0, 30)),
        )];
        // Logical day of June 11: baseline 08:30 on June 11 until 01:00 June 12.
        assert_eq!(unlogged_ms(&entries, now, &config), (16 * 60 + 30 - 30) * MINUTE);
    }

    #[test]
    fn ignores_invalid_and_auto_entries_when_measuring_logged_time() {
        let config = Config::default();
        let entries = vec![
            TimeEntry::from_draft("a".to_string(), draft("Entertainment (Auto)", at(8, 30), at(9, 30))),
            TimeEntry::from_draft("b".to_string(), draft("Work", at(9, 30), at(9, 0))),
            TimeEntry {
                id: "c".to_string(),
                started_at: None,
                stopped_at: Some(at(9, 30)),
                duration_ms: 30 * MINUTE,
                category: "Work".to_string(),
            },
            TimeEntry::from_draft("d".to_string(), draft("Work", at(7, 0), at(9, 0))),
        ];
        assert_eq!(unlogged_ms(&entries, at(10, 0), &config), 60 * MINUTE);
    }

    #[test]
    fn auto_entries_from_other_days_are_left_alone() {
        let config = Config::default();
        let store = crate::db::init_in_memory().unwrap();
        let yesterday = at(20, 0) - TimeDelta::days(1);
        store
            .add_entry(draft("Entertainment (Auto)", yesterday, yesterday + TimeDelta::hours(1)))
            .unwrap();

        let outcome = reconcile(&store, at(9, 30));

        assert!(outcome.created);
        assert_eq!(outcome.deleted, 0);
        assert_eq!(autos(&store, &config).len(), 2);
    }
}
