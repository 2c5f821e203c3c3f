/// How long a typing indicator stays lit without a refresh, in milliseconds
pub const TYPING_CLEAR_MS: u64 = 3000;

/// Default candidate search radius in kilometres
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 50.0;

/// Default page size for message history queries
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Minimum age for a profile
pub const MIN_PROFILE_AGE: u32 = 18;
