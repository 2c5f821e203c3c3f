//! Persistence for [`SwipeDecision`] rows.
//!
//! The table is keyed on the ordered (actor, target) pair, so recording a
//! decision is always an upsert: at most one decision per pair, a newer one
//! overwrites the older.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tupatane_shared::{Decision, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::models::SwipeDecision;
use crate::rows::{datetime_col, enum_col, uuid_col};

impl Database {
    /// Record (or overwrite) the decision for one ordered pair.
    pub fn upsert_decision(
        &self,
        actor: UserId,
        target: UserId,
        decision: Decision,
        decided_at: DateTime<Utc>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO decisions (actor, target, decision, decided_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(actor, target) DO UPDATE SET
                 decision   = excluded.decision,
                 decided_at = excluded.decided_at",
            params![
                actor.to_string(),
                target.to_string(),
                decision.as_str(),
                decided_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The active decision for an ordered pair, if any.
    pub fn get_decision(&self, actor: UserId, target: UserId) -> Result<Option<SwipeDecision>> {
        let row = self
            .conn()
            .query_row(
                "SELECT actor, target, decision, decided_at
                 FROM decisions WHERE actor = ?1 AND target = ?2",
                params![actor.to_string(), target.to_string()],
                row_to_decision,
            )
            .optional()?;
        Ok(row)
    }

    /// Every target the actor has an active decision on, in either
    /// direction of liking.  Used to exclude already-swiped profiles from
    /// the candidate pool.
    pub fn decided_targets(&self, actor: UserId) -> Result<Vec<UserId>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT target FROM decisions WHERE actor = ?1")?;

        let rows = stmt.query_map(params![actor.to_string()], |row| {
            let target_str: String = row.get(0)?;
            Ok(UserId(uuid_col(0, &target_str)?))
        })?;

        let mut targets = Vec::new();
        for row in rows {
            targets.push(row?);
        }
        Ok(targets)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`SwipeDecision`].
fn row_to_decision(row: &rusqlite::Row<'_>) -> rusqlite::Result<SwipeDecision> {
    let actor_str: String = row.get(0)?;
    let target_str: String = row.get(1)?;
    let decision_str: String = row.get(2)?;
    let decided_str: String = row.get(3)?;

    Ok(SwipeDecision {
        actor: UserId(uuid_col(0, &actor_str)?),
        target: UserId(uuid_col(1, &target_str)?),
        decision: enum_col(2, &decision_str, Decision::from_str)?,
        decided_at: datetime_col(3, &decided_str)?,
    })
}
