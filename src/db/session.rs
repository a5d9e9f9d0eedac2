/// Durable timer session slot.
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::store::{SessionStore, TimerSnapshot};

impl SessionStore for Connection {
    fn load_session(&self) -> Option<TimerSnapshot> {
        let raw: Option<String> = match self
            .query_row("SELECT snapshot FROM timer_session WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
        {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read timer session, treating as absent");
                return None;
            }
        };
        let raw = raw?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unparsable timer session");
                None
            }
        }
    }

    fn save_session(&self, snapshot: &TimerSnapshot) -> Result<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.execute(
            "INSERT INTO timer_session (id, snapshot) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET snapshot = excluded.snapshot",
            [raw],
        )?;
        Ok(())
    }

    fn clear_session(&self) -> Result<()> {
        self.execute("DELETE FROM timer_session", [])?;
        Ok(())
    }
}
