//! Nearby-user discovery and reciprocal-decision matching.
//!
//! Candidates are ranked by great-circle distance from the requester's
//! origin; matching is deterministic: a match forms the instant both
//! ordered pairs hold an active `like`, regardless of which side liked
//! first.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use tupatane_shared::constants::DEFAULT_SEARCH_RADIUS_KM;
use tupatane_shared::{
    distance_km, ConversationId, Coordinates, Decision, MatchId, UserId,
};
use tupatane_store::{Conversation, Database, MatchRecord, StoreError, UserProfile};

use crate::error::{CoreError, Result};
use crate::events::{DomainEvent, EventBus};

/// A ranked discovery result.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub profile: UserProfile,
    /// Distance from the query origin, kilometres.
    pub distance_km: f64,
}

/// Result of recording a swipe decision.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub matched: bool,
    pub match_id: Option<MatchId>,
    pub conversation_id: Option<ConversationId>,
}

impl DecisionOutcome {
    fn no_match() -> Self {
        Self {
            matched: false,
            match_id: None,
            conversation_id: None,
        }
    }

    fn matched(match_id: MatchId, conversation_id: ConversationId) -> Self {
        Self {
            matched: true,
            match_id: Some(match_id),
            conversation_id: Some(conversation_id),
        }
    }
}

/// The discovery/matching engine.
///
/// Shares one database handle with the chat service; the mutex serializes
/// decision writes so concurrent calls for the same pair cannot interleave.
#[derive(Clone)]
pub struct DiscoveryEngine {
    db: Arc<Mutex<Database>>,
    events: EventBus,
}

impl DiscoveryEngine {
    pub fn new(db: Arc<Mutex<Database>>, events: EventBus) -> Self {
        Self { db, events }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| CoreError::LockPoisoned)
    }

    /// Rank profiles within `radius_km` of `origin`.
    ///
    /// Sorted by ascending distance, ties broken by verified flag (verified
    /// first) then by id for determinism. Excludes the requester, anyone
    /// blocked in either direction, and — when `exclude_decided` is set —
    /// anyone the requester already swiped on.
    pub fn candidates(
        &self,
        user: UserId,
        origin: Coordinates,
        radius_km: f64,
        exclude_decided: bool,
    ) -> Result<Vec<Candidate>> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(CoreError::InvalidRadius);
        }

        let db = self.db()?;
        ensure_profile(&db, user)?;

        let decided: HashSet<UserId> = if exclude_decided {
            db.decided_targets(user)?.into_iter().collect()
        } else {
            HashSet::new()
        };

        let mut pool = Vec::new();
        for profile in db.list_profiles()? {
            if profile.id == user || decided.contains(&profile.id) {
                continue;
            }
            if db.is_blocked_between(user, profile.id)? {
                continue;
            }
            let distance = distance_km(origin, profile.home());
            if distance <= radius_km {
                pool.push(Candidate {
                    profile,
                    distance_km: distance,
                });
            }
        }

        pool.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| b.profile.verified.cmp(&a.profile.verified))
                .then_with(|| a.profile.id.cmp(&b.profile.id))
        });

        tracing::debug!(user = %user, count = pool.len(), radius_km, "candidate pool ranked");
        Ok(pool)
    }

    /// The standard card-deck query: [`candidates`] at the product default
    /// radius, excluding profiles the requester already swiped on.
    ///
    /// [`candidates`]: Self::candidates
    pub fn candidates_nearby(&self, user: UserId, origin: Coordinates) -> Result<Vec<Candidate>> {
        self.candidates(user, origin, DEFAULT_SEARCH_RADIUS_KM, true)
    }

    /// Coarse county browse: profiles in `county`, verified first, most
    /// recently seen first, with the same exclusions as [`candidates`].
    ///
    /// [`candidates`]: Self::candidates
    pub fn candidates_in_county(&self, user: UserId, county: &str) -> Result<Vec<UserProfile>> {
        let db = self.db()?;
        ensure_profile(&db, user)?;

        let decided: HashSet<UserId> = db.decided_targets(user)?.into_iter().collect();

        let mut pool = Vec::new();
        for profile in db.list_profiles_in_county(county)? {
            if profile.id == user || decided.contains(&profile.id) {
                continue;
            }
            if db.is_blocked_between(user, profile.id)? {
                continue;
            }
            pool.push(profile);
        }
        Ok(pool)
    }

    /// Record (or overwrite) `actor`'s decision about `target`.
    ///
    /// If both directions now hold `like`, the match and its conversation
    /// are created in the same transaction and a [`DomainEvent::MatchCreated`]
    /// is emitted. Re-liking an already-matched pair reports the existing
    /// match.
    pub fn record_decision(
        &self,
        actor: UserId,
        target: UserId,
        decision: Decision,
    ) -> Result<DecisionOutcome> {
        if actor == target {
            return Err(CoreError::SelfDecision);
        }

        let db = self.db()?;
        ensure_profile(&db, actor)?;
        ensure_profile(&db, target)?;
        if db.is_blocked_between(actor, target)? {
            return Err(CoreError::UserBlocked);
        }

        let tx = db.conn().unchecked_transaction().map_err(StoreError::from)?;

        db.upsert_decision(actor, target, decision, Utc::now())?;

        let mut created = None;
        let outcome = if decision == Decision::Like && reciprocal_like(&db, actor, target)? {
            match db.get_match_between(actor, target)? {
                // Re-like of an already-matched pair: idempotent.
                Some(existing) => DecisionOutcome::matched(existing.id, existing.conversation_id),
                None => {
                    // Reuse a conversation opened before the match, if any.
                    let conversation = match db.find_conversation_between(actor, target)? {
                        Some(existing) => existing,
                        None => {
                            let fresh = Conversation::new(actor, target);
                            db.insert_conversation(&fresh)?;
                            fresh
                        }
                    };

                    let record = MatchRecord::new(actor, target, conversation.id);
                    db.insert_match(&record)?;

                    tracing::info!(
                        match_id = %record.id,
                        conversation_id = %conversation.id,
                        "mutual like formed a match"
                    );

                    created = Some(DomainEvent::MatchCreated {
                        match_id: record.id,
                        conversation_id: conversation.id,
                        users: [record.user_a, record.user_b],
                    });

                    DecisionOutcome::matched(record.id, conversation.id)
                }
            }
        } else {
            DecisionOutcome::no_match()
        };

        tx.commit().map_err(StoreError::from)?;

        // Only announce the match once it is durable.
        if let Some(event) = created {
            self.events.emit(event);
        }
        Ok(outcome)
    }

    /// Active matches for a user, newest first.
    pub fn matches_for(&self, user: UserId) -> Result<Vec<MatchRecord>> {
        Ok(self.db()?.list_matches_for(user)?)
    }
}

fn reciprocal_like(db: &Database, actor: UserId, target: UserId) -> Result<bool> {
    Ok(db
        .get_decision(target, actor)?
        .map(|d| d.decision == Decision::Like)
        .unwrap_or(false))
}

fn ensure_profile(db: &Database, user: UserId) -> Result<()> {
    match db.get_profile(user) {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound) => Err(CoreError::ProfileNotFound),
        Err(other) => Err(other.into()),
    }
}
