//! RFC 3339 timestamp helpers for the external interfaces.

use chrono::{DateTime, SecondsFormat, Utc};

/// Parses an optional RFC 3339 timestamp; an empty string means "absent".
///
/// # Errors
///
/// Returns the chrono parse error for malformed input.
pub fn parse_expires_at(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value).map(|t| Some(t.with_timezone(&Utc))),
    }
}

/// Formats a timestamp as RFC 3339 in UTC with a `Z` suffix.
pub fn format_rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
