//! Thin profile service over the store.
//!
//! Account management (credentials, sessions) lives elsewhere; this only
//! covers the profile record the discovery and chat layers consume.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tupatane_shared::constants::MIN_PROFILE_AGE;
use tupatane_shared::UserId;
use tupatane_store::{Database, StoreError, UserProfile};

use crate::error::{CoreError, Result};

#[derive(Clone)]
pub struct ProfileService {
    db: Arc<Mutex<Database>>,
}

impl ProfileService {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|_| CoreError::LockPoisoned)
    }

    /// Create or replace a profile (owner-driven update).
    pub fn upsert(&self, profile: &UserProfile) -> Result<()> {
        if profile.age < MIN_PROFILE_AGE {
            return Err(CoreError::UnderMinimumAge);
        }
        self.db()?.upsert_profile(profile)?;
        tracing::debug!(user = %profile.id, "profile upserted");
        Ok(())
    }

    pub fn get(&self, user: UserId) -> Result<UserProfile> {
        match self.db()?.get_profile(user) {
            Ok(profile) => Ok(profile),
            Err(StoreError::NotFound) => Err(CoreError::ProfileNotFound),
            Err(other) => Err(other.into()),
        }
    }

    /// Record activity now; drives "last seen" display and county browse
    /// ordering.
    pub fn touch(&self, user: UserId) -> Result<()> {
        match self.db()?.touch_last_seen(user, Utc::now()) {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => Err(CoreError::ProfileNotFound),
            Err(other) => Err(other.into()),
        }
    }

    /// Flip identity verification (moderation action).
    pub fn set_verified(&self, user: UserId, verified: bool) -> Result<()> {
        match self.db()?.set_verified(user, verified) {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => Err(CoreError::ProfileNotFound),
            Err(other) => Err(other.into()),
        }
    }
}
