/// CLI argument parsing and command handling.
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::auto::reconcile_auto_entry;
use crate::calendar::{logical_day_end, logical_day_start};
use crate::caps::{enforce_capped_add, enforce_capped_edit, is_auto_category};
use crate::config::Config;
use crate::format::{clamp_name, format_clock, format_short};
use crate::store::EntryStore;
use crate::timer::{MAX_COUNTDOWN_MINUTES, SystemClock, Timer, TimerState};
use crate::types::{DayTotals, TimeEntry, TimeEntryDraft};
use crate::{db, totals};

#[derive(Parser)]
#[command(
    name = "daytally",
    version,
    about = "Daytally - A terminal stopwatch that tallies your day by category"
)]
pub struct Cli {
    /// SQLite database to use instead of the default location.
    #[arg(long, global = true)]
    pub db: Option<String>,
    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the stopwatch.
    Start,
    /// Pause the running stopwatch.
    Pause,
    /// Resume a paused stopwatch.
    Resume,
    /// Stop the stopwatch and log the time under a category.
    Stop { category: String },
    /// Discard the current stopwatch session.
    Reset,
    /// Show the stopwatch state.
    Status,
    /// Log time that just ended.
    Add { category: String, minutes: String },
    /// Change an entry's category or duration.
    Edit {
        id: String,
        #[arg(short = 'c', long = "category")]
        category: Option<String>,
        #[arg(short = 'm', long = "minutes")]
        minutes: Option<String>,
    },
    /// Delete an entry.
    Delete { id: String },
    /// Show today's totals per category.
    Today,
    /// List today's entries.
    List,
    /// Show totals for recent days.
    History {
        #[arg(short = 'd', long = "days", default_value_t = 7)]
        days: usize,
    },
    /// Interactive stopwatch (default).
    Watch,
    /// Interactive stopwatch with a countdown alarm already running.
    Countdown {
        #[arg(value_parser = clap::value_parser!(u64).range(1..=MAX_COUNTDOWN_MINUTES))]
        minutes: u64,
    },
}

impl Command {
    /// Commands that take over the terminal instead of printing.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Command::Watch | Command::Countdown { .. })
    }
}

/// Execute a non-interactive command.
pub fn run(command: Command, conn: &Connection, config: &Config) -> Result<()> {
    match command {
        Command::Start => handle_start(conn)?,
        Command::Pause => handle_pause(conn)?,
        Command::Resume => handle_resume(conn)?,
        Command::Stop { category } => handle_stop(category, conn, config)?,
        Command::Reset => handle_reset(conn)?,
        Command::Status => handle_status(conn),
        Command::Add { category, minutes } => handle_add(category, minutes, conn, config)?,
        Command::Edit {
            id,
            category,
            minutes,
        } => handle_edit(id, category, minutes, conn, config)?,
        Command::Delete { id } => handle_delete(id, conn, config)?,
        Command::Today => handle_today(conn, config)?,
        Command::List => handle_list(conn, config)?,
        Command::History { days } => handle_history(days, conn, config),
        Command::Watch | Command::Countdown { .. } => {}
    }
    Ok(())
}

fn handle_start(conn: &Connection) -> Result<()> {
    let mut timer = Timer::restore(SystemClock::new(), conn);
    if timer.start(conn)? {
        println!("Stopwatch started.");
    } else {
        println!("Stopwatch is already {}.", timer.state());
    }
    Ok(())
}

fn handle_pause(conn: &Connection) -> Result<()> {
    let mut timer = Timer::restore(SystemClock::new(), conn);
    if timer.pause(conn)? {
        println!("Paused at {}.", format_clock(timer.displayed_ms()));
    } else {
        println!("Stopwatch is not running.");
    }
    Ok(())
}

fn handle_resume(conn: &Connection) -> Result<()> {
    let mut timer = Timer::restore(SystemClock::new(), conn);
    if timer.resume(conn)? {
        println!("Resumed at {}.", format_clock(timer.elapsed_ms()));
    } else {
        println!("Stopwatch is not paused.");
    }
    Ok(())
}

fn handle_stop(category: String, conn: &Connection, config: &Config) -> Result<()> {
    if category.trim().is_empty() {
        println!("Category must not be empty.");
        return Ok(());
    }
    let mut timer = Timer::restore(SystemClock::new(), conn);
    let Some(draft) = timer.stop(conn)? else {
        println!("Stopwatch is not running.");
        return Ok(());
    };
    let saved = enforce_capped_add(TimeEntryDraft { category, ..draft }, config, conn)?;
    print_saved(&saved);
    Ok(())
}

fn handle_reset(conn: &Connection) -> Result<()> {
    let mut timer = Timer::restore(SystemClock::new(), conn);
    let was = timer.state();
    timer.reset(conn)?;
    if was == TimerState::Idle {
        println!("Nothing to reset.");
    } else {
        println!("Stopwatch reset.");
    }
    Ok(())
}

fn handle_status(conn: &Connection) {
    let timer = Timer::restore(SystemClock::new(), conn);
    match timer.started_at() {
        None => println!("Stopwatch is idle."),
        Some(started_at) => println!(
            "Stopwatch {}: {} (started {})",
            timer.state(),
            format_clock(timer.displayed_ms()),
            started_at.format("%H:%M:%S"),
        ),
    }
}

fn handle_add(category: String, minutes: String, conn: &Connection, config: &Config) -> Result<()> {
    if category.trim().is_empty() {
        println!("Category must not be empty.");
        return Ok(());
    }
    let Some(duration_ms) = parse_minutes(&minutes) else {
        println!("{MINUTES_HINT}, got '{minutes}'.");
        return Ok(());
    };
    let Some(draft) = TimeEntryDraft::ending_at(&category, duration_ms, Local::now()) else {
        println!("Minutes out of range, got '{minutes}'.");
        return Ok(());
    };
    let saved = enforce_capped_add(draft, config, conn)?;
    print_saved(&saved);
    Ok(())
}

fn handle_edit(
    id: String,
    category: Option<String>,
    minutes: Option<String>,
    conn: &Connection,
    config: &Config,
) -> Result<()> {
    let Some(entry) = resolve_entry(&id, conn)? else {
        return Ok(());
    };
    if is_auto_category(&entry.category, config) {
        println!("Auto entries are recomputed from your logged time and cannot be edited.");
        return Ok(());
    }
    let category = category.unwrap_or_else(|| entry.category.clone());
    if category.trim().is_empty() {
        println!("Category must not be empty.");
        return Ok(());
    }
    let stopped_at = entry.stopped_at.unwrap_or_else(Local::now);
    let draft = match minutes {
        Some(minutes) => {
            let Some(duration_ms) = parse_minutes(&minutes) else {
                println!("{MINUTES_HINT}, got '{minutes}'.");
                return Ok(());
            };
            TimeEntryDraft::ending_at(&category, duration_ms, stopped_at)
        }
        None => match entry.started_at {
            Some(started_at) => Some(TimeEntryDraft {
                started_at,
                stopped_at,
                duration_ms: entry.duration_ms,
                category,
            }),
            None => TimeEntryDraft::ending_at(&category, entry.duration_ms, stopped_at),
        },
    };
    let Some(draft) = draft else {
        println!("Entry '{}' has a duration out of range.", short_id(&entry.id));
        return Ok(());
    };
    let saved = enforce_capped_edit(&entry.id, draft, config, conn)?;
    print_saved(&saved);
    Ok(())
}

fn handle_delete(id: String, conn: &Connection, config: &Config) -> Result<()> {
    let Some(entry) = resolve_entry(&id, conn)? else {
        return Ok(());
    };
    conn.delete_entry(&entry.id)?;
    println!(
        "Deleted {} of {}.",
        format_short(entry.duration_ms),
        display_category(&entry, config)
    );
    Ok(())
}

fn handle_today(conn: &Connection, config: &Config) -> Result<()> {
    let now = Local::now();
    let entries = refreshed_entries(now, conn, config)?;
    print_day(&totals::day_totals(&entries, now, config), "Today");
    Ok(())
}

fn handle_list(conn: &Connection, config: &Config) -> Result<()> {
    let now = Local::now();
    let entries = refreshed_entries(now, conn, config)?;
    let day_start = logical_day_start(&now, config.day_boundary_hour);
    let day_end = logical_day_end(&now, config.day_boundary_hour);
    let mut today: Vec<&TimeEntry> = entries
        .iter()
        .filter(|entry| {
            entry
                .stopped_at
                .is_some_and(|stopped| stopped >= day_start && stopped < day_end)
        })
        .collect();
    if today.is_empty() {
        println!("No entries yet today.");
        return Ok(());
    }
    today.sort_by_key(|entry| entry.stopped_at);
    for entry in today {
        println!(
            "{}  {}-{}  {}  {}",
            short_id(&entry.id),
            format_time(entry.started_at),
            format_time(entry.stopped_at),
            clamp_name(&format_clock(entry.duration_ms), 8),
            display_category(entry, config),
        );
    }
    Ok(())
}

fn handle_history(days: usize, conn: &Connection, config: &Config) {
    let history = totals::history(&conn.list_entries(), config);
    if history.is_empty() {
        println!("No history available.");
        return;
    }
    for day in history.iter().take(days) {
        print_day(day, &day.day.format("%a %d %b %Y").to_string());
        println!();
    }
}

/// Reconciles today's auto entry and returns the ledger as it now stands.
fn refreshed_entries(now: DateTime<Local>, conn: &Connection, config: &Config) -> Result<Vec<TimeEntry>> {
    let entries = conn.list_entries();
    if reconcile_auto_entry(&entries, now, config, conn)?.changed() {
        return Ok(conn.list_entries());
    }
    Ok(entries)
}

fn resolve_entry(id: &str, conn: &Connection) -> Result<Option<TimeEntry>> {
    let mut matches = db::query_entries_by_id_prefix(id.trim(), conn)?;
    match matches.len() {
        0 => {
            println!("Entry '{id}' not found.");
            Ok(None)
        }
        1 => Ok(matches.pop()),
        _ => {
            println!("Multiple entries match '{id}', use a longer id.");
            Ok(None)
        }
    }
}

/// Longest single entry that can be logged by hand: one logical day.
const MAX_ENTRY_MINUTES: f64 = 24.0 * 60.0;
const MINUTES_HINT: &str = "Minutes must be a number above 0 and at most 1440";

/// Parses a positive, possibly fractional, number of minutes into whole
/// milliseconds.
fn parse_minutes(raw: &str) -> Option<u64> {
    let minutes: f64 = raw.trim().parse().ok()?;
    if !minutes.is_finite() || minutes <= 0.0 || minutes > MAX_ENTRY_MINUTES {
        return None;
    }
    let duration_ms = (minutes * 60_000.0).floor() as u64;
    (duration_ms > 0).then_some(duration_ms)
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn print_saved(saved: &[TimeEntry]) {
    for entry in saved {
        println!("Logged {} to {}.", format_clock(entry.duration_ms), entry.category);
    }
    if saved.len() > 1 {
        println!("Daily cap reached, the overflow went to {}.", saved[saved.len() - 1].category);
    }
}

fn print_day(day: &DayTotals, title: &str) {
    println!("{title}  total {}", format_clock(day.grand_total_ms));
    if day.totals.is_empty() {
        println!("  No entries yet.");
    }
    for total in &day.totals {
        println!("  {} {}", clamp_name(&total.category, 24), format_clock(total.duration_ms));
    }
}

fn display_category(entry: &TimeEntry, config: &Config) -> String {
    if entry.category.trim().is_empty() {
        return crate::caps::UNCATEGORIZED.to_string();
    }
    if is_auto_category(&entry.category, config) {
        return config.auto_category.clone();
    }
    entry.category.clone()
}

fn format_time(value: Option<DateTime<Local>>) -> String {
    value
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_minutes() {
        assert_eq!(parse_minutes("15"), Some(15 * 60_000));
        assert_eq!(parse_minutes(" 0.5 "), Some(30_000));
        assert_eq!(parse_minutes("1.00001"), Some(60_000));
    }

    #[test]
    fn rejects_invalid_minutes() {
        for raw in ["", "abc", "0", "-3", "NaN", "inf", "0.0000001", "1440.5", "1e12", "1e300"] {
            assert_eq!(parse_minutes(raw), None, "{raw}");
        }
        assert_eq!(parse_minutes("1440"), Some(1440 * 60_000));
    }

    #[test]
    fn oversized_minutes_never_reach_the_ledger() {
        let conn = db::init_in_memory().unwrap();
        let config = Config::default();
        handle_add("Work".to_string(), "1e12".to_string(), &conn, &config).unwrap();
        handle_add("Work".to_string(), "1e300".to_string(), &conn, &config).unwrap();
        assert!(conn.list_entries().is_empty());

        let entry = conn
            .add_entry(TimeEntryDraft::ending_at("Work", 60_000, Local::now()).unwrap())
            .unwrap();
        handle_edit(entry.id.clone(), None, Some("1e300".to_string()), &conn, &config).unwrap();
        let entries = conn.list_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, entry.id);
        assert_eq!(entries[0].duration_ms, 60_000);
    }

    #[test]
    fn short_id_counts_characters_not_bytes() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("ééééééééé"), "éééééééé");
        assert_eq!(short_id("ab"), "ab");
    }

    #[test]
    fn clap_accepts_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["daytally", "add", "Work", "30", "--db", "x.db"]).unwrap();
        assert_eq!(cli.db.as_deref(), Some("x.db"));
        assert!(matches!(cli.command, Some(Command::Add { .. })));
    }

    #[test]
    fn countdown_minutes_are_range_checked() {
        let cli = Cli::try_parse_from(["daytally", "countdown", "25"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Countdown { minutes: 25 })));
        assert!(cli.command.is_some_and(|command| command.is_interactive()));
        assert!(Cli::try_parse_from(["daytally", "countdown", "0"]).is_err());
        assert!(Cli::try_parse_from(["daytally", "countdown", "1000"]).is_err());
        assert!(!Command::Today.is_interactive());
    }

    #[test]
    fn add_with_invalid_minutes_writes_nothing() {
        let conn = db::init_in_memory().unwrap();
        let config = Config::default();
        handle_add("Work".to_string(), "soon".to_string(), &conn, &config).unwrap();
        handle_add("  ".to_string(), "10".to_string(), &conn, &config).unwrap();
        assert!(conn.list_entries().is_empty());
        handle_add("Work".to_string(), "10".to_string(), &conn, &config).unwrap();
        assert_eq!(conn.list_entries().len(), 1);
    }

    #[test]
    fn stop_with_empty_category_keeps_the_session() {
        let conn = db::init_in_memory().unwrap();
        let config = Config::default();
        handle_start(&conn).unwrap();
        handle_stop(" ".to_string(), &conn, &config).unwrap();
        assert_eq!(Timer::restore(SystemClock::new(), &conn).state(), TimerState::Running);

        handle_stop("Work".to_string(), &conn, &config).unwrap();
        assert_eq!(Timer::restore(SystemClock::new(), &conn).state(), TimerState::Idle);
        let entries = conn.list_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, "Work");
    }

    #[test]
    fn auto_entries_cannot_be_edited() {
        let conn = db::init_in_memory().unwrap();
        let config = Config::default();
        let draft = TimeEntryDraft::ending_at("Entertainment (Auto)", 60_000, Local::now()).unwrap();
        let auto = conn.add_entry(draft).unwrap();
        handle_edit(auto.id.clone(), Some("Work".to_string()), None, &conn, &config).unwrap();
        let entries = conn.list_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, auto.id);
        assert_eq!(entries[0].category, "Entertainment (Auto)");
    }

    #[test]
    fn edit_changes_category_through_the_ledger() {
        let conn = db::init_in_memory().unwrap();
        let config = Config::default();
        let entry = conn
            .add_entry(TimeEntryDraft::ending_at("Work", 60 * 60_000, Local::now()).unwrap())
            .unwrap();
        handle_edit(entry.id[..8].to_string(), Some("Shower".to_string()), None, &conn, &config)
            .unwrap();
        let mut entries = conn.list_entries();
        entries.sort_by_key(|entry| entry.stopped_at);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|stored| stored.id != entry.id));
        let total: u64 = entries.iter().map(|stored| stored.duration_ms).sum();
        assert_eq!(total, 60 * 60_000);
        assert_eq!(entries[0].category, "Shower");
        assert_eq!(entries[0].duration_ms, 45 * 60_000);
        assert_eq!(entries[1].category, "Entertainment");
    }
}
