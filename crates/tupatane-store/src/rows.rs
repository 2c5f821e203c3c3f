//! Shared row-mapping helpers for TEXT-encoded UUID and timestamp columns.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Parse a TEXT column holding a UUID, reporting the column index on failure.
pub(crate) fn uuid_col(idx: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse a TEXT column holding an RFC 3339 timestamp.
pub(crate) fn datetime_col(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse a TEXT column through a string-enum decoder such as
/// `Decision::from_str`.
pub(crate) fn enum_col<T>(
    idx: usize,
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown enum value: {value}").into(),
        )
    })
}
