//! Conversation and message lifecycle.
//!
//! Sends are an explicit two-phase write: the store accepts and sequences
//! the message (`pending`), then the service acknowledges it (`sent`).
//! `delivered` and `read` are driven externally by the transport layer
//! through [`ChatService::mark_delivered`] / [`ChatService::mark_read`].

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tupatane_shared::constants::DEFAULT_PAGE_SIZE;
use tupatane_shared::{ConversationId, DeliveryState, MessageId, MessageKind, UserId};
use tupatane_store::{Conversation, Database, Message, StoreError};

use crate::error::{CoreError, Result};
use crate::events::{DomainEvent, EventBus};

/// The conversation store service.
#[derive(Clone)]
pub struct ChatService {
    db: Arc<Mutex<Database>>,
    events: EventBus,
}

impl ChatService {
    pub fn new(db: Arc<Mutex<Database>>, events: EventBus) -> Self {
        Self { db, events }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| CoreError::LockPoisoned)
    }

    /// Create-if-absent for the unordered pair; returns the existing
    /// conversation when there is one.
    pub fn open_conversation(&self, a: UserId, b: UserId) -> Result<Conversation> {
        if a == b {
            return Err(CoreError::SelfConversation);
        }

        let db = self.db()?;
        if db.is_blocked_between(a, b)? {
            return Err(CoreError::UserBlocked);
        }

        if let Some(existing) = db.find_conversation_between(a, b)? {
            return Ok(existing);
        }

        let conversation = Conversation::new(a, b);
        db.insert_conversation(&conversation)?;
        tracing::info!(conversation_id = %conversation.id, "conversation opened");
        Ok(conversation)
    }

    /// Accept, sequence, and acknowledge a message.
    ///
    /// The returned message is in `sent` state with the next sequence
    /// number for its conversation. Failed sends are never resent by the
    /// core; a retry is a fresh call here.
    pub fn send_message(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        body: &str,
        kind: MessageKind,
    ) -> Result<Message> {
        if body.trim().is_empty() {
            return Err(CoreError::EmptyMessage);
        }

        let db = self.db()?;
        let conversation = get_conversation(&db, conversation_id)?;
        if !conversation.has_participant(sender) {
            return Err(CoreError::NotAParticipant);
        }
        if db.is_blocked_between(conversation.user_a, conversation.user_b)? {
            return Err(CoreError::UserBlocked);
        }

        // Phase one: accept and sequence.
        let mut message = db.append_message(conversation_id, sender, body, kind, Utc::now())?;
        // Phase two: the in-process ack.
        db.set_delivery_state(message.id, DeliveryState::Sent)?;
        message.state = DeliveryState::Sent;

        tracing::info!(
            message_id = %message.id,
            conversation_id = %conversation_id,
            seq = message.seq,
            "message sent"
        );

        self.events.emit(DomainEvent::MessageSent {
            conversation_id,
            message_id: message.id,
            sender,
        });

        Ok(message)
    }

    /// Transport callback: the recipient's device acknowledged receipt.
    pub fn mark_delivered(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> Result<()> {
        let db = self.db()?;
        get_conversation(&db, conversation_id)?;
        get_message(&db, conversation_id, message_id)?;
        db.set_delivery_state(message_id, DeliveryState::Delivered)?;
        Ok(())
    }

    /// Transport callback: the send was abandoned while still pending.
    /// The message stays in `failed` for the caller to decide on a resend.
    pub fn fail_message(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> Result<()> {
        let db = self.db()?;
        get_conversation(&db, conversation_id)?;
        get_message(&db, conversation_id, message_id)?;
        db.set_delivery_state(message_id, DeliveryState::Failed)?;
        Ok(())
    }

    /// `reader` opened the conversation: flip every message from the other
    /// side to `read` (where legal) and zero the reader's unread counter.
    pub fn mark_read(&self, conversation_id: ConversationId, reader: UserId) -> Result<()> {
        let db = self.db()?;
        let conversation = get_conversation(&db, conversation_id)?;
        if !conversation.has_participant(reader) {
            return Err(CoreError::NotAParticipant);
        }

        db.mark_read_from_others(conversation_id, reader)?;
        db.reset_unread(conversation_id, reader)?;
        Ok(())
    }

    /// Remove a message. Surviving sequence numbers are untouched.
    pub fn delete_message(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
    ) -> Result<()> {
        let db = self.db()?;
        get_conversation(&db, conversation_id)?;
        if !db.delete_message(conversation_id, message_id)? {
            return Err(CoreError::MessageNotFound);
        }
        Ok(())
    }

    /// The viewer's visible conversations, most recent activity first.
    pub fn conversations_for(&self, viewer: UserId) -> Result<Vec<Conversation>> {
        Ok(self.db()?.list_conversations_for(viewer)?)
    }

    /// Paginated history in sequence order.
    pub fn messages(
        &self,
        conversation_id: ConversationId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>> {
        let db = self.db()?;
        get_conversation(&db, conversation_id)?;
        Ok(db.list_messages(conversation_id, limit, offset)?)
    }

    /// The page a chat screen opens on: the newest [`DEFAULT_PAGE_SIZE`]
    /// messages, in sequence order.
    pub fn recent_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>> {
        let db = self.db()?;
        get_conversation(&db, conversation_id)?;
        Ok(db.list_recent_messages(conversation_id, DEFAULT_PAGE_SIZE)?)
    }

    /// Block another user.
    ///
    /// Permanent. Hides every conversation between the two from the
    /// blocker's list only (messages are hidden, not expunged; the blocked
    /// party's view is unaffected) and deactivates any match between them.
    pub fn block_user(&self, blocker: UserId, blocked: UserId) -> Result<()> {
        if blocker == blocked {
            return Err(CoreError::SelfBlock);
        }

        let db = self.db()?;
        db.insert_block(blocker, blocked, Utc::now())?;
        db.hide_conversations_from(blocker, blocked)?;
        db.deactivate_match_between(blocker, blocked)?;

        tracing::info!(blocker = %blocker, blocked = %blocked, "user blocked");
        Ok(())
    }
}

fn get_conversation(db: &Database, id: ConversationId) -> Result<Conversation> {
    match db.get_conversation(id) {
        Ok(conversation) => Ok(conversation),
        Err(StoreError::NotFound) => Err(CoreError::ConversationNotFound),
        Err(other) => Err(other.into()),
    }
}

fn get_message(db: &Database, conversation: ConversationId, id: MessageId) -> Result<Message> {
    match db.get_message(conversation, id) {
        Ok(message) => Ok(message),
        Err(StoreError::NotFound) => Err(CoreError::MessageNotFound),
        Err(other) => Err(other.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tupatane_shared::Coordinates;
    use tupatane_store::UserProfile;

    fn service() -> ChatService {
        let db = Arc::new(Mutex::new(Database::in_memory().unwrap()));
        ChatService::new(db, EventBus::default())
    }

    fn seed(service: &ChatService, name: &str) -> UserId {
        let profile = UserProfile::new(
            name,
            27,
            "Nairobi",
            Coordinates::new(-1.2921, 36.8219),
            vec![],
        );
        let id = profile.id;
        service.db().unwrap().upsert_profile(&profile).unwrap();
        id
    }

    #[test]
    fn open_conversation_is_idempotent_across_argument_orders() {
        let service = service();
        let (a, b) = (seed(&service, "Amina"), seed(&service, "Brian"));

        let first = service.open_conversation(a, b).unwrap();
        let second = service.open_conversation(b, a).unwrap();
        assert_eq!(first.id, second.id);

        assert!(matches!(
            service.open_conversation(a, a),
            Err(CoreError::SelfConversation)
        ));
    }

    #[test]
    fn habari_send_and_read_scenario() {
        let service = service();
        let (a, b) = (seed(&service, "Amina"), seed(&service, "Brian"));
        let conv = service.open_conversation(a, b).unwrap();

        let msg = service
            .send_message(conv.id, a, "Habari!", MessageKind::Text)
            .unwrap();
        assert_eq!(msg.seq, 1);
        assert_eq!(msg.state, DeliveryState::Sent);

        // B has one unread until they open the conversation.
        let listed = service.conversations_for(b).unwrap();
        assert_eq!(listed[0].unread_for(b), 1);
        assert_eq!(listed[0].last_message_id, Some(msg.id));

        service.mark_read(conv.id, b).unwrap();

        let history = service.messages(conv.id, 10, 0).unwrap();
        assert_eq!(history[0].state, DeliveryState::Read);
        let listed = service.conversations_for(b).unwrap();
        assert_eq!(listed[0].unread_for(b), 0);
    }

    #[test]
    fn empty_bodies_are_rejected() {
        let service = service();
        let (a, b) = (seed(&service, "Amina"), seed(&service, "Brian"));
        let conv = service.open_conversation(a, b).unwrap();

        for body in ["", "   ", "\n\t "] {
            assert!(matches!(
                service.send_message(conv.id, a, body, MessageKind::Text),
                Err(CoreError::EmptyMessage)
            ));
        }
        assert!(service.messages(conv.id, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn outsiders_cannot_send_or_mark_read() {
        let service = service();
        let (a, b) = (seed(&service, "Amina"), seed(&service, "Brian"));
        let stranger = seed(&service, "Cynthia");
        let conv = service.open_conversation(a, b).unwrap();

        assert!(matches!(
            service.send_message(conv.id, stranger, "hi", MessageKind::Text),
            Err(CoreError::NotAParticipant)
        ));
        assert!(matches!(
            service.mark_read(conv.id, stranger),
            Err(CoreError::NotAParticipant)
        ));
    }

    #[test]
    fn unknown_conversations_and_messages_are_reported() {
        let service = service();
        let (a, b) = (seed(&service, "Amina"), seed(&service, "Brian"));
        let conv = service.open_conversation(a, b).unwrap();

        assert!(matches!(
            service.send_message(ConversationId::new(), a, "hi", MessageKind::Text),
            Err(CoreError::ConversationNotFound)
        ));
        assert!(matches!(
            service.mark_read(ConversationId::new(), a),
            Err(CoreError::ConversationNotFound)
        ));
        assert!(matches!(
            service.delete_message(conv.id, MessageId::new()),
            Err(CoreError::MessageNotFound)
        ));
    }

    #[test]
    fn delivery_acks_advance_state_and_bad_acks_surface() {
        let service = service();
        let (a, b) = (seed(&service, "Amina"), seed(&service, "Brian"));
        let conv = service.open_conversation(a, b).unwrap();

        let msg = service
            .send_message(conv.id, a, "Mambo vipi?", MessageKind::Text)
            .unwrap();

        service.mark_delivered(conv.id, msg.id).unwrap();
        let history = service.messages(conv.id, 10, 0).unwrap();
        assert_eq!(history[0].state, DeliveryState::Delivered);

        // A sent message can no longer fail.
        assert!(matches!(
            service.fail_message(conv.id, msg.id),
            Err(CoreError::Store(StoreError::IllegalTransition { .. }))
        ));
    }

    #[test]
    fn pending_messages_can_fail_and_stay_failed() {
        let service = service();
        let (a, b) = (seed(&service, "Amina"), seed(&service, "Brian"));
        let conv = service.open_conversation(a, b).unwrap();

        // A message stuck in the accept phase (ack never happened).
        let stuck = service
            .db()
            .unwrap()
            .append_message(conv.id, a, "lost", MessageKind::Text, Utc::now())
            .unwrap();

        service.fail_message(conv.id, stuck.id).unwrap();
        let history = service.messages(conv.id, 10, 0).unwrap();
        assert_eq!(history[0].state, DeliveryState::Failed);

        // The message never reached B, so it no longer counts as unread.
        let listed = service.conversations_for(b).unwrap();
        assert_eq!(listed[0].unread_for(b), 0);

        // mark_read leaves the failed message alone.
        service.mark_read(conv.id, b).unwrap();
        let history = service.messages(conv.id, 10, 0).unwrap();
        assert_eq!(history[0].state, DeliveryState::Failed);
    }

    #[test]
    fn deleting_a_message_keeps_surviving_sequences() {
        let service = service();
        let (a, b) = (seed(&service, "Amina"), seed(&service, "Brian"));
        let conv = service.open_conversation(a, b).unwrap();

        let first = service
            .send_message(conv.id, a, "one", MessageKind::Text)
            .unwrap();
        let second = service
            .send_message(conv.id, b, "two", MessageKind::Text)
            .unwrap();
        let third = service
            .send_message(conv.id, a, "three", MessageKind::Text)
            .unwrap();

        service.delete_message(conv.id, second.id).unwrap();

        let history = service.messages(conv.id, 10, 0).unwrap();
        let seqs: Vec<i64> = history.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![first.seq, third.seq]);
        assert_eq!(seqs, vec![1, 3]);

        // The deleted message from B stops counting against A's unread.
        let listed = service.conversations_for(a).unwrap();
        assert_eq!(listed[0].unread_for(a), 0);
    }

    #[test]
    fn recent_messages_opens_on_the_newest_page() {
        let service = service();
        let (a, b) = (seed(&service, "Amina"), seed(&service, "Brian"));
        let conv = service.open_conversation(a, b).unwrap();

        for body in ["Habari!", "Poa sana", "Tupatane kesho?"] {
            service
                .send_message(conv.id, a, body, MessageKind::Text)
                .unwrap();
        }

        let page = service.recent_messages(conv.id).unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].seq, 1);
        assert_eq!(page[2].body, "Tupatane kesho?");

        assert!(matches!(
            service.recent_messages(ConversationId::new()),
            Err(CoreError::ConversationNotFound)
        ));
    }

    #[test]
    fn conversation_list_sorts_by_last_activity() {
        let service = service();
        let a = seed(&service, "Amina");
        let b = seed(&service, "Brian");
        let c = seed(&service, "Cynthia");

        let with_b = service.open_conversation(a, b).unwrap();
        let with_c = service.open_conversation(a, c).unwrap();

        service
            .send_message(with_b.id, b, "Niaje!", MessageKind::Text)
            .unwrap();

        let listed = service.conversations_for(a).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, with_b.id);

        service
            .send_message(with_c.id, c, "Tupatane kesho?", MessageKind::Text)
            .unwrap();

        let listed = service.conversations_for(a).unwrap();
        assert_eq!(listed[0].id, with_c.id);
    }

    #[test]
    fn blocking_hides_the_blockers_view_and_freezes_messaging() {
        let service = service();
        let (a, b) = (seed(&service, "Amina"), seed(&service, "Brian"));
        let conv = service.open_conversation(a, b).unwrap();
        service
            .send_message(conv.id, b, "Jambo", MessageKind::Text)
            .unwrap();

        service.block_user(a, b).unwrap();
        // Blocking again is a no-op.
        service.block_user(a, b).unwrap();

        assert!(service.conversations_for(a).unwrap().is_empty());
        // The blocked party keeps their view, messages intact.
        let b_view = service.conversations_for(b).unwrap();
        assert_eq!(b_view.len(), 1);
        assert_eq!(service.messages(conv.id, 10, 0).unwrap().len(), 1);

        // Neither side can message the other now.
        assert!(matches!(
            service.send_message(conv.id, a, "hello?", MessageKind::Text),
            Err(CoreError::UserBlocked)
        ));
        assert!(matches!(
            service.send_message(conv.id, b, "hello?", MessageKind::Text),
            Err(CoreError::UserBlocked)
        ));
        assert!(matches!(
            service.open_conversation(a, b),
            Err(CoreError::UserBlocked)
        ));
        assert!(matches!(
            service.block_user(a, a),
            Err(CoreError::SelfBlock)
        ));
    }

    #[test]
    fn sends_emit_events() {
        let service = service();
        let (a, b) = (seed(&service, "Amina"), seed(&service, "Brian"));
        let conv = service.open_conversation(a, b).unwrap();
        let mut rx = service.events.subscribe();

        let msg = service
            .send_message(conv.id, a, "Habari!", MessageKind::Text)
            .unwrap();

        match rx.try_recv().unwrap() {
            DomainEvent::MessageSent { message_id, .. } => assert_eq!(message_id, msg.id),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
