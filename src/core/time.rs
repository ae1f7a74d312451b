//! Shared timestamp and event-id helpers.
//!
//! All persisted timestamps are RFC 3339 / ISO-8601 strings in UTC with
//! millisecond precision, so lexicographic order agrees with time order.

use crate::core::error::{ErrorCode, LedgerError};
use chrono::{DateTime, SecondsFormat, Utc};
use ulid::Ulid;

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Parse an ISO-8601 timestamp, failing with `WIN.INVALID` so guard and
/// window checks reject malformed input instead of silently coercing it.
pub fn parse_iso(ts: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            LedgerError::domain(
                ErrorCode::WindowInvalid,
                format!("unparseable timestamp '{}': {}", ts, e),
            )
        })
}

/// Fractional days elapsed between `ts` and `now`; negative if `ts` is in
/// the future.
pub fn days_between(ts: &str, now: DateTime<Utc>) -> Result<f64, LedgerError> {
    let then = parse_iso(ts)?;
    Ok((now - then).num_milliseconds() as f64 / (1000.0 * 60.0 * 60.0 * 24.0))
}
