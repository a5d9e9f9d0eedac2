mod app;
mod auto;
mod calendar;
mod caps;
mod cli;
mod config;
mod db;
mod event;
mod format;
mod logging;
mod store;
mod timer;
mod totals;
mod tui;
mod types;
mod ui;

use anyhow::Result;
use clap::Parser;

use crate::timer::SystemClock;

fn main() -> Result<()> {
    let cli_opts = cli::Cli::parse();
    let interactive = cli_opts
        .command
        .as_ref()
        .is_none_or(|command| command.is_interactive());
    // The terminal belongs to the screen in interactive mode, so logs go to a
    // file there. Without a data dir they are dropped.
    let _log_guard = if interactive {
        logging::default_log_dir()
            .map(|dir| logging::init_file(&dir))
            .transpose()?
    } else {
        logging::init_stderr();
        None
    };

    let config = config::load(cli_opts.config.as_deref())?;
    let db_path = cli_opts.db.unwrap_or_else(db::default_db_path);
    let conn = db::init(&db_path)?;

    let countdown_minutes = match cli_opts.command {
        None | Some(cli::Command::Watch) => None,
        Some(cli::Command::Countdown { minutes }) => Some(minutes),
        Some(command) => return cli::run(command, &conn, &config),
    };

    let mut app = app::App::new(conn, config, SystemClock::new());
    if let Some(minutes) = countdown_minutes {
        app.start_countdown(minutes);
    }
    let mut terminal = tui::init()?;
    let result = event::run(&mut app, &mut terminal);

    tui::restore(&mut terminal)?;

    result
}
