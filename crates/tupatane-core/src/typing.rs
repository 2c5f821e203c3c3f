//! Ephemeral typing indicators.
//!
//! Nothing here touches the database: typing state lives in memory and
//! auto-expires. Each (conversation, user) key owns at most one scheduled
//! clear task; refreshing the indicator cancels and reschedules rather than
//! stacking timers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tupatane_shared::constants::TYPING_CLEAR_MS;
use tupatane_shared::{ConversationId, UserId};

type Key = (ConversationId, UserId);

/// Tracks who is typing where.
///
/// Presence of a key in the map is the flag itself; the stored handle is
/// the pending auto-clear task. Must be used from within a tokio runtime.
pub struct TypingTracker {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<Key, JoinHandle<()>>>>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_millis(TYPING_CLEAR_MS))
    }

    /// Tracker with a custom auto-clear TTL (tests use short ones).
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Set or clear the typing flag for (conversation, user).
    ///
    /// `true` lights the flag and schedules the auto-clear; calling again
    /// before expiry resets the clock. `false` clears immediately and
    /// cancels the pending timer.
    pub fn set_typing(&self, conversation: ConversationId, user: UserId, is_typing: bool) {
        let key = (conversation, user);
        let mut entries = lock_entries(&self.entries);

        if let Some(handle) = entries.remove(&key) {
            handle.abort();
        }

        if is_typing {
            let ttl = self.ttl;
            let map = Arc::clone(&self.entries);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                lock_entries(&map).remove(&key);
            });
            entries.insert(key, handle);
        }
    }

    /// Whether `user` is currently typing in `conversation`.
    pub fn is_typing(&self, conversation: ConversationId, user: UserId) -> bool {
        lock_entries(&self.entries).contains_key(&(conversation, user))
    }

    /// Everyone currently typing in `conversation`.
    pub fn typing_in(&self, conversation: ConversationId) -> Vec<UserId> {
        lock_entries(&self.entries)
            .keys()
            .filter(|(conv, _)| *conv == conversation)
            .map(|(_, user)| *user)
            .collect()
    }
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TypingTracker {
    fn drop(&mut self) {
        // No timers may outlive the tracker.
        for (_, handle) in lock_entries(&self.entries).drain() {
            handle.abort();
        }
    }
}

/// The lock is only ever held for map lookups, so a poisoned lock means a
/// panic mid-lookup; recovering the inner map is safe.
fn lock_entries<'a>(
    entries: &'a Arc<Mutex<HashMap<Key, JoinHandle<()>>>>,
) -> std::sync::MutexGuard<'a, HashMap<Key, JoinHandle<()>>> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT_TTL: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn typing_flag_auto_clears_after_the_ttl() {
        let tracker = TypingTracker::with_ttl(SHORT_TTL);
        let conv = ConversationId::new();
        let user = UserId::new();

        tracker.set_typing(conv, user, true);
        assert!(tracker.is_typing(conv, user));

        tokio::time::sleep(SHORT_TTL * 3).await;
        assert!(!tracker.is_typing(conv, user));
    }

    #[tokio::test]
    async fn refreshing_resets_the_clock_instead_of_stacking() {
        let tracker = TypingTracker::with_ttl(Duration::from_millis(300));
        let conv = ConversationId::new();
        let user = UserId::new();

        tracker.set_typing(conv, user, true);
        tokio::time::sleep(Duration::from_millis(200)).await;
        // Refresh well before expiry.
        tracker.set_typing(conv, user, true);
        tokio::time::sleep(Duration::from_millis(200)).await;

        // 400 ms after the first call, but only 200 ms after the refresh.
        assert!(tracker.is_typing(conv, user));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!tracker.is_typing(conv, user));
    }

    #[tokio::test]
    async fn explicit_clear_cancels_the_timer() {
        let tracker = TypingTracker::with_ttl(SHORT_TTL);
        let conv = ConversationId::new();
        let user = UserId::new();

        tracker.set_typing(conv, user, true);
        tracker.set_typing(conv, user, false);
        assert!(!tracker.is_typing(conv, user));

        // Clearing an already-clear flag is a no-op.
        tracker.set_typing(conv, user, false);
        assert!(!tracker.is_typing(conv, user));
    }

    #[tokio::test]
    async fn keys_are_independent_per_conversation_and_user() {
        let tracker = TypingTracker::with_ttl(Duration::from_secs(60));
        let conv = ConversationId::new();
        let other_conv = ConversationId::new();
        let (a, b) = (UserId::new(), UserId::new());

        tracker.set_typing(conv, a, true);
        tracker.set_typing(conv, b, true);
        tracker.set_typing(other_conv, a, true);

        let mut typing = tracker.typing_in(conv);
        typing.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(typing, expected);

        tracker.set_typing(conv, a, false);
        assert_eq!(tracker.typing_in(conv), vec![b]);
        assert!(tracker.is_typing(other_conv, a));
    }
}
