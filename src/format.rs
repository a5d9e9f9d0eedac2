//! Display helpers shared by the CLI and the watch loop.

/// `HH:MM:SS` once past an hour, `MM:SS` before.
pub fn format_clock(duration_ms: u64) -> String {
    let total_seconds = duration_ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Like `format_clock`, rounding partial seconds up so a countdown only
/// reads `00:00` once it is done.
pub fn format_countdown(remaining_ms: u64) -> String {
    format_clock(remaining_ms.div_ceil(1000).saturating_mul(1000))
}

/// Compact form for history lines, e.g. `1h 05m` or `12m`.
pub fn format_short(duration_ms: u64) -> String {
    let total_minutes = duration_ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

pub fn clamp_name(value: &str, width: usize) -> String {
    let value_len = value.chars().count();
    if value_len <= width {
        return format!("{value:<width$}", width = width);
    }
    let trimmed = value
        .chars()
        .take(width.saturating_sub(2))
        .collect::<String>();
    format!("{trimmed}..")
}
