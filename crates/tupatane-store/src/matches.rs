//! Persistence for [`MatchRecord`] rows.

use rusqlite::{params, OptionalExtension};
use tupatane_shared::{ConversationId, MatchId, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::models::{canonical_pair, MatchRecord};
use crate::rows::{datetime_col, uuid_col};

impl Database {
    /// Insert a new match.
    pub fn insert_match(&self, record: &MatchRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO matches (id, user_a, user_b, conversation_id, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.user_a.to_string(),
                record.user_b.to_string(),
                record.conversation_id.to_string(),
                record.active,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The match between two users, regardless of argument order.
    pub fn get_match_between(&self, a: UserId, b: UserId) -> Result<Option<MatchRecord>> {
        let (user_a, user_b) = canonical_pair(a, b);
        let row = self
            .conn()
            .query_row(
                "SELECT id, user_a, user_b, conversation_id, active, created_at
                 FROM matches WHERE user_a = ?1 AND user_b = ?2",
                params![user_a.to_string(), user_b.to_string()],
                row_to_match,
            )
            .optional()?;
        Ok(row)
    }

    /// Every active match involving `user`, newest first.
    pub fn list_matches_for(&self, user: UserId) -> Result<Vec<MatchRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_a, user_b, conversation_id, active, created_at
             FROM matches
             WHERE active = 1 AND (user_a = ?1 OR user_b = ?1)
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![user.to_string()], row_to_match)?;

        let mut matches = Vec::new();
        for row in rows {
            matches.push(row?);
        }
        Ok(matches)
    }

    /// Mark the match between two users inactive (block fallout).
    /// Returns `true` if a row changed.
    pub fn deactivate_match_between(&self, a: UserId, b: UserId) -> Result<bool> {
        let (user_a, user_b) = canonical_pair(a, b);
        let affected = self.conn().execute(
            "UPDATE matches SET active = 0 WHERE user_a = ?1 AND user_b = ?2",
            params![user_a.to_string(), user_b.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`MatchRecord`].
fn row_to_match(row: &rusqlite::Row<'_>) -> rusqlite::Result<MatchRecord> {
    let id_str: String = row.get(0)?;
    let user_a_str: String = row.get(1)?;
    let user_b_str: String = row.get(2)?;
    let conv_str: String = row.get(3)?;
    let active: bool = row.get(4)?;
    let created_str: String = row.get(5)?;

    Ok(MatchRecord {
        id: MatchId(uuid_col(0, &id_str)?),
        user_a: UserId(uuid_col(1, &user_a_str)?),
        user_b: UserId(uuid_col(2, &user_b_str)?),
        conversation_id: ConversationId(uuid_col(3, &conv_str)?),
        active,
        created_at: datetime_col(5, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_lookup_ignores_argument_order() {
        let db = Database::in_memory().unwrap();
        let (a, b) = (UserId::new(), UserId::new());
        let record = MatchRecord::new(a, b, ConversationId::new());
        db.insert_match(&record).unwrap();

        assert_eq!(db.get_match_between(a, b).unwrap(), Some(record.clone()));
        assert_eq!(db.get_match_between(b, a).unwrap(), Some(record));
        assert!(db
            .get_match_between(a, UserId::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn deactivated_matches_leave_the_active_listing() {
        let db = Database::in_memory().unwrap();
        let (a, b) = (UserId::new(), UserId::new());
        db.insert_match(&MatchRecord::new(a, b, ConversationId::new()))
            .unwrap();

        assert_eq!(db.list_matches_for(a).unwrap().len(), 1);
        assert!(db.deactivate_match_between(b, a).unwrap());
        assert!(db.list_matches_for(a).unwrap().is_empty());

        // The row itself survives.
        let record = db.get_match_between(a, b).unwrap().unwrap();
        assert!(!record.active);
    }
}
