//! v001 -- Initial schema creation.
//!
//! Creates the six core tables: `profiles`, `decisions`, `matches`,
//! `conversations`, `messages`, and `blocks`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Profiles
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS profiles (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    display_name TEXT NOT NULL,
    age          INTEGER NOT NULL,
    county       TEXT NOT NULL,               -- Kenyan county name
    latitude     REAL NOT NULL,               -- home coordinates, degrees
    longitude    REAL NOT NULL,
    interests    TEXT NOT NULL,               -- JSON array of tags
    verified     INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    last_seen    TEXT NOT NULL,               -- ISO-8601 / RFC-3339
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_profiles_county ON profiles(county);

-- ----------------------------------------------------------------
-- Swipe decisions (one active row per ordered actor/target pair)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS decisions (
    actor      TEXT NOT NULL,                 -- FK -> profiles(id)
    target     TEXT NOT NULL,                 -- FK -> profiles(id)
    decision   TEXT NOT NULL,                 -- 'like' | 'pass'
    decided_at TEXT NOT NULL,

    PRIMARY KEY (actor, target)
);

CREATE INDEX IF NOT EXISTS idx_decisions_target ON decisions(target, decision);

-- ----------------------------------------------------------------
-- Matches (mutual likes; one conversation each)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS matches (
    id              TEXT PRIMARY KEY NOT NULL, -- UUID v4
    user_a          TEXT NOT NULL,             -- canonical order: user_a < user_b
    user_b          TEXT NOT NULL,
    conversation_id TEXT NOT NULL,             -- FK -> conversations(id)
    active          INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL,

    UNIQUE (user_a, user_b)
);

-- ----------------------------------------------------------------
-- Conversations (direct, exactly two participants)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id              TEXT PRIMARY KEY NOT NULL, -- UUID v4
    user_a          TEXT NOT NULL,             -- canonical order: user_a < user_b
    user_b          TEXT NOT NULL,
    unread_a        INTEGER NOT NULL DEFAULT 0,
    unread_b        INTEGER NOT NULL DEFAULT 0,
    hidden_a        INTEGER NOT NULL DEFAULT 0, -- hidden from user_a's list
    hidden_b        INTEGER NOT NULL DEFAULT 0,
    last_message_id TEXT,                      -- denormalized for list sorting
    last_activity   TEXT NOT NULL,
    created_at      TEXT NOT NULL,

    UNIQUE (user_a, user_b)
);

CREATE INDEX IF NOT EXISTS idx_conversations_activity
    ON conversations(last_activity DESC);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL, -- UUID v4
    conversation_id TEXT NOT NULL,             -- FK -> conversations(id)
    sender          TEXT NOT NULL,             -- FK -> profiles(id)
    body            TEXT NOT NULL,
    kind            TEXT NOT NULL,             -- 'text' | 'system'
    seq             INTEGER NOT NULL,          -- per-conversation, assigned at acceptance
    state           TEXT NOT NULL,             -- delivery lifecycle
    created_at      TEXT NOT NULL,

    UNIQUE (conversation_id, seq),
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_seq
    ON messages(conversation_id, seq);

-- ----------------------------------------------------------------
-- Blocks (permanent, directional)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS blocks (
    blocker    TEXT NOT NULL,                  -- FK -> profiles(id)
    blocked    TEXT NOT NULL,                  -- FK -> profiles(id)
    created_at TEXT NOT NULL,

    PRIMARY KEY (blocker, blocked)
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
