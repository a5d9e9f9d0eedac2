/// Database module with entry and timer session persistence plus migrations.
mod entries;
mod migrations;
mod session;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub use entries::query_entries_by_id_prefix;

/// Opens (or creates) the SQLite database and runs migrations.
pub fn init(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open database {db_path}"))?;
    migrations::run_migrations(&conn)?;
    tracing::debug!(db_path, "database ready");
    Ok(conn)
}

/// Fresh private database, used by tests.
#[cfg(test)]
pub fn init_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

/// Returns the default database path inside the user's data directory.
/// Falls back to `./daytally.db` when no data dir is found.
pub fn default_db_path() -> String {
    if let Some(data_dir) = dirs::data_local_dir() {
        let app_dir = data_dir.join("daytally");
        std::fs::create_dir_all(&app_dir).ok();
        app_dir.join("daytally.db").to_string_lossy().into_owned()
    } else {
        "daytally.db".to_string()
    }
}
