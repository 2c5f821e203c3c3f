//! # tupatane-core
//!
//! Service layer for the Tupatane matching and messaging core: the
//! discovery/matching engine, the conversation store, typing indicators,
//! and the domain event stream the notification layer subscribes to.
//!
//! All services share one database handle; the mutex around it is what
//! serializes concurrent sessions of the same user (multiple devices)
//! against each other.

pub mod chat;
pub mod discovery;
pub mod events;
pub mod profiles;
pub mod typing;

mod error;

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tupatane_store::Database;

pub use chat::ChatService;
pub use discovery::{Candidate, DecisionOutcome, DiscoveryEngine};
pub use error::{CoreError, Result};
pub use events::{DomainEvent, EventBus};
pub use profiles::ProfileService;
pub use typing::TypingTracker;

/// All core services wired over one shared database.
pub struct Tupatane {
    pub profiles: ProfileService,
    pub discovery: DiscoveryEngine,
    pub chat: ChatService,
    pub typing: TypingTracker,
    events: EventBus,
}

impl Tupatane {
    /// Open the default application database and build the services.
    pub fn open_default() -> Result<Self> {
        Ok(Self::from_database(Database::new()?))
    }

    /// Build against a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::from_database(Database::open_at(path)?))
    }

    /// Build against a throwaway in-memory database.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::in_memory()?))
    }

    pub fn from_database(database: Database) -> Self {
        let db = Arc::new(Mutex::new(database));
        let events = EventBus::default();
        Self {
            profiles: ProfileService::new(Arc::clone(&db)),
            discovery: DiscoveryEngine::new(Arc::clone(&db), events.clone()),
            chat: ChatService::new(db, events.clone()),
            typing: TypingTracker::new(),
            events,
        }
    }

    /// Subscribe to match and message events.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tupatane_shared::{Coordinates, Decision, MessageKind, UserId};
    use tupatane_store::UserProfile;

    fn profile(name: &str, home: Coordinates) -> UserProfile {
        UserProfile::new(name, 27, "Nairobi", home, vec!["Music".into()])
    }

    #[test]
    fn match_to_first_message_end_to_end() {
        let nairobi = Coordinates::new(-1.2921, 36.8219);
        let core = Tupatane::in_memory().unwrap();
        let mut rx = core.subscribe();

        let amina = profile("Amina", nairobi);
        let brian = profile("Brian", nairobi);
        core.profiles.upsert(&amina).unwrap();
        core.profiles.upsert(&brian).unwrap();

        // Amina discovers Brian and likes him; he likes back.
        let ranked = core
            .discovery
            .candidates(amina.id, nairobi, 50.0, true)
            .unwrap();
        assert_eq!(ranked[0].profile.id, brian.id);

        core.discovery
            .record_decision(amina.id, brian.id, Decision::Like)
            .unwrap();
        let outcome = core
            .discovery
            .record_decision(brian.id, amina.id, Decision::Like)
            .unwrap();
        assert!(outcome.matched);
        let conv_id = outcome.conversation_id.unwrap();

        // First message lands with sequence 1 and gets read.
        let msg = core
            .chat
            .send_message(conv_id, amina.id, "Habari!", MessageKind::Text)
            .unwrap();
        assert_eq!(msg.seq, 1);
        core.chat.mark_read(conv_id, brian.id).unwrap();

        // Both events came through in order.
        assert!(matches!(
            rx.try_recv().unwrap(),
            DomainEvent::MatchCreated { .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            DomainEvent::MessageSent { .. }
        ));
    }

    #[test]
    fn services_share_one_database() {
        let core = Tupatane::in_memory().unwrap();
        let amina = profile("Amina", Coordinates::new(-1.2921, 36.8219));
        core.profiles.upsert(&amina).unwrap();

        // A block recorded through chat is honored by discovery.
        let ghost = UserId::new();
        let brian = profile("Brian", Coordinates::new(-1.2921, 36.8219));
        core.profiles.upsert(&brian).unwrap();
        core.chat.block_user(amina.id, brian.id).unwrap();
        assert!(matches!(
            core.discovery
                .record_decision(amina.id, brian.id, Decision::Like),
            Err(CoreError::UserBlocked)
        ));
        assert!(matches!(
            core.profiles.get(ghost),
            Err(CoreError::ProfileNotFound)
        ));
    }
}
