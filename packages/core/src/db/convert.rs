//! Row decoding helpers shared by the stores

use crate::db::error::StoreError;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a stored timestamp - handles both SQLite and RFC 3339 formats.
///
/// SQLite `CURRENT_TIMESTAMP` produces `YYYY-MM-DD HH:MM:SS`; values written
/// by application code use RFC 3339.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(StoreError::corrupt(format!(
        "unparseable timestamp '{}'",
        s
    )))
}

/// Parse an optional stored timestamp (tombstones)
pub(crate) fn parse_opt_timestamp(
    s: Option<&str>,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    s.map(parse_timestamp).transpose()
}
