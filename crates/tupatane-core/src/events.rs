//! Domain event stream for the notification layer.
//!
//! Services publish onto a `tokio::sync::broadcast` channel; the UI /
//! push-notification layer subscribes. Emission is best-effort: having no
//! subscribers is normal, not an error.

use serde::Serialize;
use tokio::sync::broadcast;
use tupatane_shared::{ConversationId, MatchId, MessageId, UserId};

/// Default buffered event capacity per subscriber.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub enum DomainEvent {
    /// A mutual like just formed a match (and its conversation).
    MatchCreated {
        match_id: MatchId,
        conversation_id: ConversationId,
        users: [UserId; 2],
    },
    /// A message was accepted and acknowledged.
    MessageSent {
        conversation_id: ConversationId,
        message_id: MessageId,
        sender: UserId,
    },
}

/// Cloneable handle to the broadcast channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Open a new subscription. Events emitted before this call are not
    /// replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: DomainEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("no event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}
