//! # tupatane-store
//!
//! SQLite persistence for the Tupatane matching and messaging core.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model: profiles, swipe decisions, matches, conversations, messages, and
//! blocks. Schema migrations run before any other operation.

pub mod blocks;
pub mod conversations;
pub mod database;
pub mod decisions;
pub mod matches;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod profiles;

mod error;
mod rows;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
