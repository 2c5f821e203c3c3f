//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the UI layer over IPC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tupatane_shared::{
    Coordinates, ConversationId, Decision, DeliveryState, MatchId, MessageId, MessageKind, UserId,
};

/// Order a participant pair canonically (smaller id first) so unordered
/// pairs map to exactly one row.
pub fn canonical_pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

// ---------------------------------------------------------------------------
// UserProfile
// ---------------------------------------------------------------------------

/// A dating profile.  Immutable apart from owner-driven profile updates,
/// the `verified` flag, and `last_seen`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    /// Unique profile identifier.
    pub id: UserId,
    /// Display name shown on cards and in chats.
    pub display_name: String,
    pub age: u32,
    /// Home county (coarse location, e.g. "Nairobi").
    pub county: String,
    /// Home latitude in decimal degrees.
    pub latitude: f64,
    /// Home longitude in decimal degrees.
    pub longitude: f64,
    /// Interest tags, e.g. "Travel", "Music".
    pub interests: Vec<String>,
    /// Whether the profile passed identity verification.
    pub verified: bool,
    /// Last time the owner was active.
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(
        display_name: impl Into<String>,
        age: u32,
        county: impl Into<String>,
        home: Coordinates,
        interests: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            display_name: display_name.into(),
            age,
            county: county.into(),
            latitude: home.latitude,
            longitude: home.longitude,
            interests,
            verified: false,
            last_seen: now,
            created_at: now,
        }
    }

    /// Home coordinates as a [`Coordinates`] value.
    pub fn home(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// SwipeDecision
// ---------------------------------------------------------------------------

/// The active like/pass decision for one ordered (actor, target) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwipeDecision {
    pub actor: UserId,
    pub target: UserId,
    pub decision: Decision,
    pub decided_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// MatchRecord
// ---------------------------------------------------------------------------

/// A mutual like.  Owns exactly one conversation; never deleted, only
/// marked inactive when either party blocks the other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchRecord {
    pub id: MatchId,
    /// Canonical order: `user_a < user_b`.
    pub user_a: UserId,
    pub user_b: UserId,
    pub conversation_id: ConversationId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn new(a: UserId, b: UserId, conversation_id: ConversationId) -> Self {
        let (user_a, user_b) = canonical_pair(a, b);
        Self {
            id: MatchId::new(),
            user_a,
            user_b,
            conversation_id,
            active: true,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A direct conversation between exactly two users.
///
/// `last_message_id` and `last_activity` are denormalized so conversation
/// lists can be sorted without touching the messages table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    /// Canonical order: `user_a < user_b`.
    pub user_a: UserId,
    pub user_b: UserId,
    pub unread_a: u32,
    pub unread_b: u32,
    /// Hidden from `user_a`'s conversation list (set when `user_a` blocks).
    pub hidden_a: bool,
    pub hidden_b: bool,
    pub last_message_id: Option<MessageId>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(a: UserId, b: UserId) -> Self {
        let (user_a, user_b) = canonical_pair(a, b);
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            user_a,
            user_b,
            unread_a: 0,
            unread_b: 0,
            hidden_a: false,
            hidden_b: false,
            last_message_id: None,
            last_activity: now,
            created_at: now,
        }
    }

    pub fn has_participant(&self, user: UserId) -> bool {
        self.user_a == user || self.user_b == user
    }

    /// The participant that is not `user`.
    pub fn other_participant(&self, user: UserId) -> Option<UserId> {
        if user == self.user_a {
            Some(self.user_b)
        } else if user == self.user_b {
            Some(self.user_a)
        } else {
            None
        }
    }

    pub fn unread_for(&self, user: UserId) -> u32 {
        if user == self.user_a {
            self.unread_a
        } else {
            self.unread_b
        }
    }

    pub fn hidden_for(&self, user: UserId) -> bool {
        if user == self.user_a {
            self.hidden_a
        } else {
            self.hidden_b
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.  Append-only apart from delivery-state
/// transitions; display order is `seq`, never the timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: UserId,
    pub body: String,
    pub kind: MessageKind,
    /// Per-conversation sequence number assigned at acceptance time.
    pub seq: i64,
    pub state: DeliveryState,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A directional, permanent block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub blocker: UserId,
    pub blocked: UserId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_ignores_argument_order() {
        let a = UserId::new();
        let b = UserId::new();
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
    }

    #[test]
    fn conversation_participant_helpers() {
        let a = UserId::new();
        let b = UserId::new();
        let stranger = UserId::new();
        let conv = Conversation::new(a, b);

        assert!(conv.has_participant(a));
        assert!(conv.has_participant(b));
        assert!(!conv.has_participant(stranger));
        assert_eq!(conv.other_participant(a), Some(b));
        assert_eq!(conv.other_participant(stranger), None);
        assert_eq!(conv.unread_for(a), 0);
    }
}
