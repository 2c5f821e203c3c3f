//! Persistence for [`Block`] rows.

use chrono::{DateTime, Utc};
use rusqlite::params;
use tupatane_shared::UserId;

use crate::database::Database;
use crate::error::Result;
use crate::models::Block;
use crate::rows::{datetime_col, uuid_col};

impl Database {
    /// Record a block.  Blocks are permanent, so re-blocking is a no-op.
    pub fn insert_block(&self, blocker: UserId, blocked: UserId, at: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO blocks (blocker, blocked, created_at)
             VALUES (?1, ?2, ?3)",
            params![blocker.to_string(), blocked.to_string(), at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Whether a block exists between two users in either direction.
    pub fn is_blocked_between(&self, a: UserId, b: UserId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM blocks
             WHERE (blocker = ?1 AND blocked = ?2)
                OR (blocker = ?2 AND blocked = ?1)",
            params![a.to_string(), b.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Everyone `blocker` has blocked, oldest first.
    pub fn list_blocked_by(&self, blocker: UserId) -> Result<Vec<Block>> {
        let mut stmt = self.conn().prepare(
            "SELECT blocker, blocked, created_at
             FROM blocks WHERE blocker = ?1
             ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![blocker.to_string()], |row| {
            let blocker_str: String = row.get(0)?;
            let blocked_str: String = row.get(1)?;
            let created_str: String = row.get(2)?;
            Ok(Block {
                blocker: UserId(uuid_col(0, &blocker_str)?),
                blocked: UserId(uuid_col(1, &blocked_str)?),
                created_at: datetime_col(2, &created_str)?,
            })
        })?;

        let mut blocks = Vec::new();
        for row in rows {
            blocks.push(row?);
        }
        Ok(blocks)
    }
}
