// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical timestamp formatting.
//!
//! Every timestamp in the pipeline is an RFC 3339 UTC string with
//! millisecond precision and a `Z` suffix, matching SQLite's
//! `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`. One format everywhere keeps
//! TEXT-column comparisons lexicographic.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a datetime in the canonical millisecond-`Z` form.
pub fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The current time in the canonical form.
pub fn now_ts() -> String {
    format_ts(Utc::now())
}

/// Parse a canonical (or any RFC 3339) timestamp back into a datetime.
pub fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
