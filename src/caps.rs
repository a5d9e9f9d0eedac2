/// Per-logical-day category ceilings.
///
/// Capped categories never exceed their daily ceiling in storage: a draft that
/// would cross it is split, and the overflow is booked on the fallback
/// category instead of being dropped.
use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Local, TimeDelta};

use crate::calendar::{logical_day_end, logical_day_start};
use crate::config::Config;
use crate::store::EntryStore;
use crate::types::{CategoryTotal, TimeEntry, TimeEntryDraft};

pub const UNCATEGORIZED: &str = "Uncategorized";

pub fn normalize_category_key(category: &str) -> String {
    category.trim().to_lowercase()
}

pub fn is_auto_category(category: &str, config: &Config) -> bool {
    normalize_category_key(category) == normalize_category_key(&config.auto_category)
}

/// Display name a category is totalled under: trimmed, with the auto
/// category folded into the fallback.
pub fn aggregation_category(category: &str, config: &Config) -> String {
    if is_auto_category(category, config) {
        config.fallback_category.clone()
    } else {
        category.trim().to_string()
    }
}

/// Normalized key of `category` when it is capped. Empty categories are
/// never capped.
pub fn capped_category_key(category: &str, config: &Config) -> Option<String> {
    let key = normalize_category_key(&aggregation_category(category, config));
    if key.is_empty() || !config.caps.contains_key(&key) {
        return None;
    }
    Some(key)
}

/// Milliseconds already booked on `capped_key` during the logical day that
/// contains `day_reference`. Entries are attributed by their stop time.
pub fn used_capped_ms_for_day(
    entries: &[TimeEntry],
    capped_key: &str,
    day_reference: DateTime<Local>,
    config: &Config,
) -> u64 {
    let day_start = logical_day_start(&day_reference, config.day_boundary_hour);
    let day_end = logical_day_end(&day_reference, config.day_boundary_hour);
    entries
        .iter()
        .filter(|entry| {
            entry
                .stopped_at
                .is_some_and(|stopped| stopped >= day_start && stopped < day_end)
        })
        .filter(|entry| {
            normalize_category_key(&aggregation_category(&entry.category, config)) == capped_key
        })
        .map(|entry| entry.duration_ms)
        .sum()
}

/// Splits `draft` so that at most `allowed_ms` stays on its category.
///
/// Returns the draft itself when it fits, a single fallback-category draft
/// over the same window when nothing is allowed, and otherwise two
/// contiguous drafts meeting at `started_at + allowed_ms`.
pub fn split_draft_for_cap_overflow(
    draft: TimeEntryDraft,
    allowed_ms: u64,
    config: &Config,
) -> Vec<TimeEntryDraft> {
    if draft.duration_ms <= allowed_ms {
        return vec![draft];
    }
    if allowed_ms == 0 {
        return vec![TimeEntryDraft {
            category: config.fallback_category.clone(),
            ..draft
        }];
    }

    let overflow_ms = draft.duration_ms - allowed_ms;
    let split_at = (draft.started_at + TimeDelta::milliseconds(allowed_ms as i64))
        .min(draft.stopped_at);
    let capped = TimeEntryDraft {
        started_at: draft.started_at,
        stopped_at: split_at,
        duration_ms: allowed_ms,
        category: draft.category.clone(),
    };
    let overflow = TimeEntryDraft {
        started_at: split_at,
        stopped_at: draft.stopped_at,
        duration_ms: overflow_ms,
        category: config.fallback_category.clone(),
    };
    vec![capped, overflow]
}

/// Persists `draft`, splitting it when it would push a capped category over
/// its ceiling for the draft's logical day. Returns the stored entries in
/// write order.
///
/// The read of current usage and the writes are not isolated from each
/// other, so callers must be the only writer.
pub fn enforce_capped_add(
    draft: TimeEntryDraft,
    config: &Config,
    store: &impl EntryStore,
) -> Result<Vec<TimeEntry>> {
    let draft = TimeEntryDraft {
        category: draft.category.trim().to_string(),
        ..draft
    };
    let drafts = match capped_category_key(&draft.category, config) {
        None => vec![draft],
        Some(key) => {
            let limit_ms = config.cap_limit_ms(&key).unwrap_or(u64::MAX);
            let used_ms =
                used_capped_ms_for_day(&store.list_entries(), &key, draft.stopped_at, config);
            let remaining_ms = limit_ms.saturating_sub(used_ms);
            tracing::debug!(category = %key, limit_ms, used_ms, remaining_ms, "capped add");
            split_draft_for_cap_overflow(draft, remaining_ms, config)
        }
    };

    let mut saved = Vec::with_capacity(drafts.len());
    for draft in drafts {
        saved.push(store.add_entry(draft)?);
    }
    Ok(saved)
}

/// Replaces the entry `id` with `draft`, re-running cap enforcement as if
/// the edited entry were logged fresh.
pub fn enforce_capped_edit(
    id: &str,
    draft: TimeEntryDraft,
    config: &Config,
    store: &impl EntryStore,
) -> Result<Vec<TimeEntry>> {
    store.delete_entry(id)?;
    enforce_capped_add(draft, config, store)
}

/// Re-aggregates totals by normalized category and clamps every capped
/// category to its ceiling, moving the excess into the fallback category.
///
/// The result does not depend on the order of `totals`: display names are
/// picked deterministically and rows are sorted by duration, then name.
pub fn apply_caps_to_category_totals(
    totals: &[CategoryTotal],
    config: &Config,
) -> Vec<CategoryTotal> {
    let mut aggregate: BTreeMap<String, CategoryTotal> = BTreeMap::new();
    for total in totals {
        let mut display = aggregation_category(&total.category, config);
        if display.is_empty() {
            display = UNCATEGORIZED.to_string();
        }
        let row = aggregate
            .entry(normalize_category_key(&display))
            .or_insert_with(|| CategoryTotal {
                category: display.clone(),
                duration_ms: 0,
            });
        row.duration_ms += total.duration_ms;
        if display < row.category {
            row.category = display;
        }
    }

    let mut overflow_ms = 0;
    for (key, row) in aggregate.iter_mut() {
        let Some(limit_ms) = config.cap_limit_ms(key) else {
            continue;
        };
        if row.duration_ms > limit_ms {
            overflow_ms += row.duration_ms - limit_ms;
            row.duration_ms = limit_ms;
        }
    }

    if overflow_ms > 0 {
        aggregate
            .entry(normalize_category_key(&config.fallback_category))
            .or_insert_with(|| CategoryTotal {
                category: config.fallback_category.clone(),
                duration_ms: 0,
            })
            .duration_ms += overflow_ms;
    }

    let mut adjusted: Vec<CategoryTotal> = aggregate.into_values().collect();
    adjusted.sort_by(|a, b| {
        b.duration_ms
            .cmp(&a.duration_ms)
            .then_with(|| a.category.cmp(&b.category))
    });
    adjusted
}
