/// Database migrations and schema management.
use anyhow::Result;
use rusqlite::Connection;

/// Creates the schema if it doesn't exist yet.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS entries (
            id          TEXT    PRIMARY KEY,
            started_at  TEXT    NOT NULL,
            stopped_at  TEXT    NOT NULL,
            duration_ms INTEGER NOT NULL,
            category    TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS timer_session (
            id       INTEGER PRIMARY KEY CHECK (id = 1),
            snapshot TEXT    NOT NULL
        );
        ",
    )?;
    migrate_entries_add_stopped_index(conn)?;
    Ok(())
}

fn migrate_entries_add_stopped_index(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("PRAGMA index_list(entries)")?;
    let rows = stmt.query_map([], |row| {
        let name: String = row.get(1)?;
        Ok(name)
    })?;
    for row in rows {
        if row? == "idx_entries_stopped_at" {
            return Ok(());
        }
    }

    conn.execute("CREATE INDEX idx_entries_stopped_at ON entries (stopped_at)", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_entries_stopped_at'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
