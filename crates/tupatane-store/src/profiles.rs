//! CRUD operations for [`UserProfile`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use tupatane_shared::UserId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::UserProfile;
use crate::rows::{datetime_col, uuid_col};

impl Database {
    // ------------------------------------------------------------------
    // Create / update
    // ------------------------------------------------------------------

    /// Insert a profile, or replace it entirely if the id already exists
    /// (owner-driven profile update).
    pub fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        let interests = serde_json::to_string(&profile.interests)?;
        self.conn().execute(
            "INSERT INTO profiles
                 (id, display_name, age, county, latitude, longitude,
                  interests, verified, last_seen, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                 display_name = excluded.display_name,
                 age          = excluded.age,
                 county       = excluded.county,
                 latitude     = excluded.latitude,
                 longitude    = excluded.longitude,
                 interests    = excluded.interests,
                 verified     = excluded.verified,
                 last_seen    = excluded.last_seen",
            params![
                profile.id.to_string(),
                profile.display_name,
                profile.age,
                profile.county,
                profile.latitude,
                profile.longitude,
                interests,
                profile.verified,
                profile.last_seen.to_rfc3339(),
                profile.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Record activity for presence / "last seen" display.
    pub fn touch_last_seen(&self, user: UserId, at: DateTime<Utc>) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE profiles SET last_seen = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), user.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Flip the identity-verification flag.
    pub fn set_verified(&self, user: UserId, verified: bool) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE profiles SET verified = ?1 WHERE id = ?2",
            params![verified, user.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single profile by id.
    pub fn get_profile(&self, user: UserId) -> Result<UserProfile> {
        self.conn()
            .query_row(
                "SELECT id, display_name, age, county, latitude, longitude,
                        interests, verified, last_seen, created_at
                 FROM profiles WHERE id = ?1",
                params![user.to_string()],
                row_to_profile,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List every profile.  The candidate pool at this product's scale is
    /// small enough to rank in memory; a spatial index would replace this.
    pub fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, display_name, age, county, latitude, longitude,
                    interests, verified, last_seen, created_at
             FROM profiles",
        )?;

        let rows = stmt.query_map([], row_to_profile)?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }

    /// List profiles in a county, verified first, most recently seen first.
    pub fn list_profiles_in_county(&self, county: &str) -> Result<Vec<UserProfile>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, display_name, age, county, latitude, longitude,
                    interests, verified, last_seen, created_at
             FROM profiles
             WHERE county = ?1
             ORDER BY verified DESC, last_seen DESC",
        )?;

        let rows = stmt.query_map(params![county], row_to_profile)?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`UserProfile`].
fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    let id_str: String = row.get(0)?;
    let display_name: String = row.get(1)?;
    let age: u32 = row.get(2)?;
    let county: String = row.get(3)?;
    let latitude: f64 = row.get(4)?;
    let longitude: f64 = row.get(5)?;
    let interests_json: String = row.get(6)?;
    let verified: bool = row.get(7)?;
    let last_seen_str: String = row.get(8)?;
    let created_str: String = row.get(9)?;

    let interests: Vec<String> = serde_json::from_str(&interests_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(UserProfile {
        id: UserId(uuid_col(0, &id_str)?),
        display_name,
        age,
        county,
        latitude,
        longitude,
        interests,
        verified,
        last_seen: datetime_col(8, &last_seen_str)?,
        created_at: datetime_col(9, &created_str)?,
    })
}
