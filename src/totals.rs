/// Per-day category totals, recomputed from the ledger on every read.
use std::collections::BTreeMap;

use chrono::{DateTime, Local, NaiveDate};

use crate::calendar::{logical_date, logical_day_end, logical_day_start};
use crate::caps::apply_caps_to_category_totals;
use crate::config::Config;
use crate::types::{CategoryTotal, DayTotals, TimeEntry};

/// Capped totals for the logical day containing `day_reference`.
pub fn day_totals(entries: &[TimeEntry], day_reference: DateTime<Local>, config: &Config) -> DayTotals {
    let day_start = logical_day_start(&day_reference, config.day_boundary_hour);
    let day_end = logical_day_end(&day_reference, config.day_boundary_hour);
    let raw: Vec<CategoryTotal> = entries
        .iter()
        .filter(|entry| {
            entry
                .stopped_at
                .is_some_and(|stopped| stopped >= day_start && stopped < day_end)
        })
        .map(entry_total)
        .collect();
    summarize(logical_date(&day_reference, config.day_boundary_hour), &raw, config)
}

/// Capped totals for every logical day with at least one entry, newest
/// first.
pub fn history(entries: &[TimeEntry], config: &Config) -> Vec<DayTotals> {
    let mut days: BTreeMap<NaiveDate, Vec<CategoryTotal>> = BTreeMap::new();
    for entry in entries {
        let Some(stopped_at) = entry.stopped_at else {
            continue;
        };
        days.entry(logical_date(&stopped_at, config.day_boundary_hour))
            .or_default()
            .push(entry_total(entry));
    }
    days.into_iter()
        .rev()
        .map(|(day, raw)| summarize(day, &raw, config))
        .collect()
}

fn entry_total(entry: &TimeEntry) -> CategoryTotal {
    CategoryTotal {
        category: entry.category.clone(),
        duration_ms: entry.duration_ms,
    }
}

fn summarize(day: NaiveDate, raw: &[CategoryTotal], config: &Config) -> DayTotals {
    let totals = apply_caps_to_category_totals(raw, config);
    let grand_total_ms = totals.iter().map(|total| total.duration_ms).sum();
    DayTotals {
        day,
        totals,
        grand_total_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    const MINUTE: u64 = 60_000;

    fn entry(category: &str, stop: DateTime<Local>, minutes: u64) -> TimeEntry {
        TimeEntry {
            id: format!("{category}-{stop}"),
            started_at: Some(stop - TimeDelta::minutes(minutes as i64)),
            stopped_at: Some(stop),
            duration_ms: minutes * MINUTE,
            category: category.to_string(),
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, day, hour, minute, 0).unwrap()
    }

    fn total(category: &str, minutes: u64) -> CategoryTotal {
        CategoryTotal {
            category: category.to_string(),
            duration_ms: minutes * MINUTE,
        }
    }

    #[test]
    fn today_folds_auto_time_into_entertainment() {
        let config = Config::default();
        let entries = vec![
            entry("Work", at(12, 10, 0), 60),
            entry("Entertainment (Auto)", at(12, 11, 0), 30),
            entry("Entertainment", at(12, 12, 0), 15),
            entry("", at(12, 12, 30), 5),
            entry("Work", at(11, 10, 0), 60),
        ];
        let today = day_totals(&entries, at(12, 13, 0), &config);
        assert_eq!(today.day, NaiveDate::from_ymd_opt(2024, 6, 12).unwrap());
        assert_eq!(
            today.totals,
            vec![total("Work", 60), total("Entertainment", 45), total("Uncategorized", 5)]
        );
        assert_eq!(today.grand_total_ms, 110 * MINUTE);
    }

    #[test]
    fn late_night_entries_count_towards_previous_day() {
        let config = Config::default();
        let entries = vec![entry("Reading", at(13, 1, 30), 60)];
        let evening = day_totals(&entries, at(12, 22, 0), &config);
        assert_eq!(evening.totals, vec![total("Reading", 60)]);
        let next_morning = day_totals(&entries, at(13, 9, 0), &config);
        assert!(next_morning.totals.is_empty());
        assert_eq!(next_morning.grand_total_ms, 0);
    }

    #[test]
    fn historical_entries_are_clamped_at_read_time() {
        let config = Config::default();
        let entries = vec![entry("Shower", at(12, 8, 0), 50), entry("Shower", at(12, 20, 0), 20)];
        let today = day_totals(&entries, at(12, 21, 0), &config);
        assert_eq!(today.totals, vec![total("Shower", 45), total("Entertainment", 25)]);
        assert_eq!(today.grand_total_ms, 70 * MINUTE);
    }

    #[test]
    fn history_groups_by_logical_day_newest_first() {
        let config = Config::default();
        let mut entries = vec![
            entry("Work", at(10, 10, 0), 30),
            entry("Work", at(12, 2, 0), 30),
            entry("Study", at(12, 10, 0), 20),
        ];
        entries.push(TimeEntry {
            stopped_at: None,
            ..entry("Ghost", at(12, 10, 0), 99)
        });
        let days = history(&entries, &config);
        let dates: Vec<NaiveDate> = days.iter().map(|day| day.day).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 11).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            ]
        );
        assert_eq!(days[0].totals, vec![total("Study", 20)]);
        assert_eq!(days[1].totals, vec![total("Work", 30)]);
    }
}
