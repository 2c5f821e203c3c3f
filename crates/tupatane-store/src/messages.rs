//! Persistence for [`Message`] rows.
//!
//! Acceptance of a message assigns its per-conversation sequence number,
//! bumps the recipient's unread counter, and refreshes the conversation's
//! last-message pointer inside one transaction, so concurrent sessions can
//! never observe a partially applied send.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tupatane_shared::{ConversationId, DeliveryState, MessageId, MessageKind, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Message;
use crate::rows::{datetime_col, enum_col, uuid_col};

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender, body, kind, seq, state, created_at";

impl Database {
    /// Accept a message into a conversation.
    ///
    /// The message starts in `pending`; the caller drives the pending→sent
    /// transition once it has sequenced its own ack.  Sequence assignment,
    /// the recipient's unread increment, and the last-message pointer update
    /// are one atomic unit.
    pub fn append_message(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        body: &str,
        kind: MessageKind,
        at: DateTime<Utc>,
    ) -> Result<Message> {
        let tx = self.conn().unchecked_transaction()?;

        let conversation_exists: bool = tx
            .query_row(
                "SELECT 1 FROM conversations WHERE id = ?1",
                params![conversation_id.to_string()],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !conversation_exists {
            return Err(StoreError::NotFound);
        }

        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE conversation_id = ?1",
            params![conversation_id.to_string()],
            |row| row.get(0),
        )?;

        let message = Message {
            id: MessageId::new(),
            conversation_id,
            sender,
            body: body.to_string(),
            kind,
            seq,
            state: DeliveryState::Pending,
            created_at: at,
        };

        tx.execute(
            "INSERT INTO messages (id, conversation_id, sender, body, kind, seq, state, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.id.to_string(),
                conversation_id.to_string(),
                sender.to_string(),
                message.body,
                kind.as_str(),
                seq,
                message.state.as_str(),
                at.to_rfc3339(),
            ],
        )?;

        // Unread goes to whichever side did not send.
        tx.execute(
            "UPDATE conversations SET
                 unread_a = CASE WHEN user_a != ?2 THEN unread_a + 1 ELSE unread_a END,
                 unread_b = CASE WHEN user_b != ?2 THEN unread_b + 1 ELSE unread_b END,
                 last_message_id = ?3,
                 last_activity = ?4
             WHERE id = ?1",
            params![
                conversation_id.to_string(),
                sender.to_string(),
                message.id.to_string(),
                at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;
        Ok(message)
    }

    /// Advance a message along its delivery lifecycle.
    ///
    /// Setting the state it already has is an idempotent no-op (duplicate
    /// transport acks); any other transition outside the legal set fails
    /// with [`StoreError::IllegalTransition`].
    ///
    /// Failing a pending message takes it back out of the recipient's unread
    /// count in the same transaction: it was counted at acceptance but never
    /// reached anyone.
    pub fn set_delivery_state(&self, message_id: MessageId, next: DeliveryState) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;

        let (current, conv_str, sender_str): (String, String, String) = tx
            .query_row(
                "SELECT state, conversation_id, sender FROM messages WHERE id = ?1",
                params![message_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;

        let current = DeliveryState::from_str(&current).ok_or(StoreError::NotFound)?;
        if current == next {
            return Ok(());
        }
        if !current.can_advance_to(next) {
            return Err(StoreError::IllegalTransition {
                from: current,
                to: next,
            });
        }

        tx.execute(
            "UPDATE messages SET state = ?1 WHERE id = ?2",
            params![next.as_str(), message_id.to_string()],
        )?;

        if next == DeliveryState::Failed {
            decrement_recipient_unread(&tx, &conv_str, &sender_str)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Mark every message in the conversation that was not sent by `reader`
    /// as read, where the transition is legal (pending and failed messages
    /// are left alone).  Returns the number of messages flipped.
    pub fn mark_read_from_others(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
    ) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE messages SET state = 'read'
             WHERE conversation_id = ?1
               AND sender != ?2
               AND state IN ('sent', 'delivered')",
            params![conversation_id.to_string(), reader.to_string()],
        )?;
        Ok(affected)
    }

    /// Fetch a single message, scoped to its conversation.
    pub fn get_message(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> Result<Message> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE id = ?1 AND conversation_id = ?2"
                ),
                params![message_id.to_string(), conversation_id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Page through a conversation's history in sequence order.
    pub fn list_messages(
        &self,
        conversation_id: ConversationId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ?1
             ORDER BY seq ASC
             LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(
            params![conversation_id.to_string(), limit, offset],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// The newest `limit` messages of a conversation, returned in sequence
    /// order (oldest of the page first).
    pub fn list_recent_messages(
        &self,
        conversation_id: ConversationId,
        limit: u32,
    ) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ?1
             ORDER BY seq DESC
             LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![conversation_id.to_string(), limit], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        messages.reverse();
        Ok(messages)
    }

    /// Remove a message.  Remaining sequence numbers are not renumbered.
    /// If the deleted message was the conversation's newest, the
    /// last-message pointer falls back to the next-newest survivor.
    /// Deleting a message the recipient has not read yet also releases its
    /// slot in their unread count.  Returns `true` if a row was deleted.
    pub fn delete_message(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;

        let doomed: Option<(String, String)> = tx
            .query_row(
                "SELECT state, sender FROM messages
                 WHERE id = ?1 AND conversation_id = ?2",
                params![message_id.to_string(), conversation_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((state_str, sender_str)) = doomed else {
            return Ok(false);
        };

        tx.execute(
            "DELETE FROM messages WHERE id = ?1 AND conversation_id = ?2",
            params![message_id.to_string(), conversation_id.to_string()],
        )?;

        // Read messages were already cleared from the counter by mark_read;
        // failed ones were released when they failed.
        let state = DeliveryState::from_str(&state_str).ok_or(StoreError::NotFound)?;
        if matches!(
            state,
            DeliveryState::Pending | DeliveryState::Sent | DeliveryState::Delivered
        ) {
            decrement_recipient_unread(&tx, &conversation_id.to_string(), &sender_str)?;
        }

        let newest: Option<String> = tx
            .query_row(
                "SELECT id FROM messages WHERE conversation_id = ?1
                 ORDER BY seq DESC LIMIT 1",
                params![conversation_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        tx.execute(
            "UPDATE conversations SET last_message_id = ?2 WHERE id = ?1",
            params![conversation_id.to_string(), newest],
        )?;

        tx.commit()?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Take one message back out of the non-sender's unread counter, clamped at
/// zero (the recipient may already have reset it by reading).
fn decrement_recipient_unread(
    conn: &rusqlite::Connection,
    conversation_id: &str,
    sender: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE conversations SET
             unread_a = CASE WHEN user_a != ?2 AND unread_a > 0
                             THEN unread_a - 1 ELSE unread_a END,
             unread_b = CASE WHEN user_b != ?2 AND unread_b > 0
                             THEN unread_b - 1 ELSE unread_b END
         WHERE id = ?1",
        params![conversation_id, sender],
    )?;
    Ok(())
}

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let conv_str: String = row.get(1)?;
    let sender_str: String = row.get(2)?;
    let body: String = row.get(3)?;
    let kind_str: String = row.get(4)?;
    let seq: i64 = row.get(5)?;
    let state_str: String = row.get(6)?;
    let created_str: String = row.get(7)?;

    Ok(Message {
        id: MessageId(uuid_col(0, &id_str)?),
        conversation_id: ConversationId(uuid_col(1, &conv_str)?),
        sender: UserId(uuid_col(2, &sender_str)?),
        body,
        kind: enum_col(4, &kind_str, MessageKind::from_str)?,
        seq,
        state: enum_col(6, &state_str, DeliveryState::from_str)?,
        created_at: datetime_col(7, &created_str)?,
    })
}
