//! Runtime timestamp parsing.

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{RuntimeError, RuntimeResult};

/// Parse an RFC 3339 runtime timestamp such as
/// `2024-01-02T03:04:05.123456789Z`, truncated to whole seconds.
///
/// The zero value `0001-01-01T00:00:00Z` (never started / never finished)
/// parses like any other timestamp.
pub fn parse_timestamp(s: &str) -> RuntimeResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc).trunc_subsecs(0))
        .map_err(|e| RuntimeError::Decode(format!("bad timestamp {s:?}: {e}")))
}
