/// Logical-day arithmetic. A logical day runs from the boundary hour (3 AM by
/// default) to the same hour on the next calendar day, so late-night activity
/// is booked on the day it belongs to.
use chrono::{
    DateTime, DurationRound, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta,
    TimeZone, Timelike,
};

/// Calendar date of the logical day `instant` falls in.
pub fn logical_date<Tz: TimeZone>(instant: &DateTime<Tz>, boundary_hour: u32) -> NaiveDate {
    let date = instant.date_naive();
    if instant.hour() < boundary_hour {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// First instant of the logical day containing `instant`.
pub fn logical_day_start<Tz: TimeZone>(instant: &DateTime<Tz>, boundary_hour: u32) -> DateTime<Tz> {
    let date = logical_date(instant, boundary_hour);
    let boundary = NaiveTime::from_hms_opt(boundary_hour, 0, 0).unwrap_or_default();
    resolve_local(&instant.timezone(), date.and_time(boundary))
}

/// End (exclusive) of the logical day containing `instant`.
pub fn logical_day_end<Tz: TimeZone>(instant: &DateTime<Tz>, boundary_hour: u32) -> DateTime<Tz> {
    logical_day_start(instant, boundary_hour) + TimeDelta::hours(24)
}

/// Maps a wall-clock reading onto `tz`. Ambiguous readings take the earlier
/// instant; readings inside a DST gap are moved forward by the gap.
pub fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + TimeDelta::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

/// Drops sub-millisecond precision so instants survive a round trip through
/// storage unchanged.
pub fn truncate_to_millis<Tz: TimeZone>(instant: DateTime<Tz>) -> DateTime<Tz> {
    instant
        .clone()
        .duration_trunc(TimeDelta::milliseconds(1))
        .unwrap_or(instant)
}
