//! Persistence for [`Conversation`] rows.
//!
//! Participants are stored in canonical order so the unordered pair is
//! unique; the per-side unread counters and hidden flags are updated with
//! single CASE-expression statements so they stay atomic.

use rusqlite::{params, OptionalExtension};
use tupatane_shared::{ConversationId, MessageId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{canonical_pair, Conversation};
use crate::rows::{datetime_col, uuid_col};

const CONVERSATION_COLUMNS: &str = "id, user_a, user_b, unread_a, unread_b,
    hidden_a, hidden_b, last_message_id, last_activity, created_at";

impl Database {
    /// Insert a new conversation.
    pub fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.conn().execute(
            "INSERT INTO conversations
                 (id, user_a, user_b, unread_a, unread_b, hidden_a, hidden_b,
                  last_message_id, last_activity, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                conversation.id.to_string(),
                conversation.user_a.to_string(),
                conversation.user_b.to_string(),
                conversation.unread_a,
                conversation.unread_b,
                conversation.hidden_a,
                conversation.hidden_b,
                conversation.last_message_id.map(|m| m.to_string()),
                conversation.last_activity.to_rfc3339(),
                conversation.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a conversation by id.
    pub fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        self.conn()
            .query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![id.to_string()],
                row_to_conversation,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// The conversation between two users, regardless of argument order.
    pub fn find_conversation_between(&self, a: UserId, b: UserId) -> Result<Option<Conversation>> {
        let (user_a, user_b) = canonical_pair(a, b);
        let row = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE user_a = ?1 AND user_b = ?2"
                ),
                params![user_a.to_string(), user_b.to_string()],
                row_to_conversation,
            )
            .optional()?;
        Ok(row)
    }

    /// Conversations visible to `viewer`, most recent activity first.
    /// Conversations the viewer hid by blocking are excluded.
    pub fn list_conversations_for(&self, viewer: UserId) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE (user_a = ?1 AND hidden_a = 0)
                OR (user_b = ?1 AND hidden_b = 0)
             ORDER BY last_activity DESC"
        ))?;

        let rows = stmt.query_map(params![viewer.to_string()], row_to_conversation)?;

        let mut conversations = Vec::new();
        for row in rows {
            conversations.push(row?);
        }
        Ok(conversations)
    }

    /// Zero one participant's unread counter.
    pub fn reset_unread(&self, id: ConversationId, participant: UserId) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE conversations SET
                 unread_a = CASE WHEN user_a = ?2 THEN 0 ELSE unread_a END,
                 unread_b = CASE WHEN user_b = ?2 THEN 0 ELSE unread_b END
             WHERE id = ?1",
            params![id.to_string(), participant.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Hide every conversation between the two users from `blocker`'s list.
    /// The other side's view is untouched.  Returns the number of rows
    /// changed (0 or 1 for direct conversations).
    pub fn hide_conversations_from(&self, blocker: UserId, other: UserId) -> Result<usize> {
        let (user_a, user_b) = canonical_pair(blocker, other);
        let affected = self.conn().execute(
            "UPDATE conversations SET
                 hidden_a = CASE WHEN user_a = ?3 THEN 1 ELSE hidden_a END,
                 hidden_b = CASE WHEN user_b = ?3 THEN 1 ELSE hidden_b END
             WHERE user_a = ?1 AND user_b = ?2",
            params![
                user_a.to_string(),
                user_b.to_string(),
                blocker.to_string()
            ],
        )?;
        Ok(affected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Conversation`].
fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let id_str: String = row.get(0)?;
    let user_a_str: String = row.get(1)?;
    let user_b_str: String = row.get(2)?;
    let unread_a: u32 = row.get(3)?;
    let unread_b: u32 = row.get(4)?;
    let hidden_a: bool = row.get(5)?;
    let hidden_b: bool = row.get(6)?;
    let last_message_str: Option<String> = row.get(7)?;
    let last_activity_str: String = row.get(8)?;
    let created_str: String = row.get(9)?;

    let last_message_id = match last_message_str {
        Some(s) => Some(MessageId(uuid_col(7, &s)?)),
        None => None,
    };

    Ok(Conversation {
        id: ConversationId(uuid_col(0, &id_str)?),
        user_a: UserId(uuid_col(1, &user_a_str)?),
        user_b: UserId(uuid_col(2, &user_b_str)?),
        unread_a,
        unread_b,
        hidden_a,
        hidden_b,
        last_message_id,
        last_activity: datetime_col(8, &last_activity_str)?,
        created_at: datetime_col(9, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_round_trips_and_pair_lookup_is_unordered() {
        let db = Database::in_memory().unwrap();
        let (a, b) = (UserId::new(), UserId::new());
        let conv = Conversation::new(a, b);
        db.insert_conversation(&conv).unwrap();

        assert_eq!(db.get_conversation(conv.id).unwrap(), conv);
        assert_eq!(db.find_conversation_between(b, a).unwrap(), Some(conv));
        assert!(db
            .find_conversation_between(a, UserId::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_conversation_is_not_found() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.get_conversation(ConversationId::new()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.reset_unread(ConversationId::new(), UserId::new()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn hiding_affects_only_the_blocker_side() {
        let db = Database::in_memory().unwrap();
        let (a, b) = (UserId::new(), UserId::new());
        let conv = Conversation::new(a, b);
        db.insert_conversation(&conv).unwrap();

        assert_eq!(db.hide_conversations_from(a, b).unwrap(), 1);

        assert!(db.list_conversations_for(a).unwrap().is_empty());
        let visible_to_b = db.list_conversations_for(b).unwrap();
        assert_eq!(visible_to_b.len(), 1);
        assert!(visible_to_b[0].hidden_for(a));
        assert!(!visible_to_b[0].hidden_for(b));
    }

    #[test]
    fn reset_unread_zeroes_only_that_side() {
        let db = Database::in_memory().unwrap();
        let (a, b) = (UserId::new(), UserId::new());
        let mut conv = Conversation::new(a, b);
        conv.unread_a = 3;
        conv.unread_b = 2;
        db.insert_conversation(&conv).unwrap();

        db.reset_unread(conv.id, conv.user_a).unwrap();

        let loaded = db.get_conversation(conv.id).unwrap();
        assert_eq!(loaded.unread_a, 0);
        assert_eq!(loaded.unread_b, 2);
    }
}
