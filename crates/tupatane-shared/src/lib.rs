//! # tupatane-shared
//!
//! Domain types shared by every Tupatane crate: typed identifiers, the
//! swipe-decision and message-delivery enums, geospatial coordinates with
//! the great-circle distance used for candidate ranking, and product-wide
//! constants.

pub mod constants;
pub mod geo;
pub mod types;

pub use geo::{distance_km, Coordinates};
pub use types::*;
