//! Database migration runner.
//!
//! Each migration is a (version, name, up) entry in [`MIGRATIONS`]; the
//! runner applies every entry above the connection's `user_version` pragma
//! in order, bumping the pragma as it goes, so each one runs exactly once.

pub mod v001_initial;

use rusqlite::Connection;

use crate::error::{Result, StoreError};

type Up = fn(&Connection) -> rusqlite::Result<()>;

/// All schema migrations, oldest first.  Append here when the schema
/// changes; never reorder or edit a shipped entry.
const MIGRATIONS: &[(u32, &str, Up)] = &[(1, "initial", v001_initial::up)];

/// Run all pending migrations against the open connection.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    for (version, name, up) in MIGRATIONS {
        if current >= *version {
            continue;
        }
        tracing::info!(version = *version, name = *name, "applying schema migration");
        up(conn).map_err(|e| StoreError::Migration(format!("{name}: {e}")))?;
        conn.pragma_update(None, "user_version", *version)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_lands_on_the_latest_version() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, MIGRATIONS.last().unwrap().0);

        // Running again is a no-op, not a re-application.
        run_migrations(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN
                     ('profiles', 'decisions', 'matches',
                      'conversations', 'messages', 'blocks')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 6);
    }
}
