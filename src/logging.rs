use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DAYTALLY_LOG";

/// Installs the global subscriber for one-shot commands. Logs go to stderr so
/// command output on stdout stays clean; verbosity comes from `DAYTALLY_LOG`
/// (default `warn`).
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Installs the global subscriber for the interactive screen, writing to
/// `daytally.log` under `log_dir` so nothing is drawn over the frame. Keep
/// the guard alive until the process exits or buffered lines are lost.
pub fn init_file(log_dir: &Path) -> Result<WorkerGuard> {
    let (writer, guard) = file_writer(log_dir)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Ok(guard)
}

pub fn default_log_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("daytally"))
}

fn file_writer(log_dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("daytally")
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("failed to open log file in {}", log_dir.display()))?;
    Ok(tracing_appender::non_blocking(appender))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_writer_captures_events_instead_of_the_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, guard) = file_writer(dir.path()).unwrap();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(rows = 2, "discarding corrupt rows");
        });
        drop(guard);

        let contents: String = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|file| std::fs::read_to_string(file.unwrap().path()).unwrap())
            .collect();
        assert!(contents.contains("discarding corrupt rows"));
        assert!(contents.contains("rows=2"));
    }
}
