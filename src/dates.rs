//! Date normalization for registry and certificate sources.
//!
//! Registry data comes in many shapes: RFC 3339, `GMT`-suffixed strings,
//! `20-Jul-2025`, dotted or slashed numeric dates and the odd epoch value.
//! `normalize_date` tries each family in turn and returns the first instant
//! that parses.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

use crate::probe::ProbeError;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const NAIVE_DATETIME_FORMATS: [&str; 11] = [
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%a, %d %b %Y %H:%M:%S",
    "%a %b %d %H:%M:%S %Y",
];

const OFFSET_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%z",
];

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Parse a free-text date into a UTC instant.
///
/// On failure the error carries the original string.
pub fn normalize_date(raw: &str) -> Result<DateTime<Utc>, ProbeError> {
    let cleaned = strip_gmt(raw.trim());

    parse_general(cleaned)
        .or_else(|| parse_day_month_year(cleaned))
        .or_else(|| parse_epoch(cleaned))
        .ok_or_else(|| ProbeError::Parse {
            message: "unrecognized date format".to_string(),
            raw: raw.to_string(),
        })
}

/// Whole days until `expiry`, rounded up. Negative once expired.
pub fn days_until(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    const MILLIS_PER_DAY: f64 = 86_400_000.0;
    let millis = (expiry - now).num_milliseconds() as f64;
    (millis / MILLIS_PER_DAY).ceil() as i64
}

fn strip_gmt(s: &str) -> &str {
    match s.strip_suffix("GMT") {
        Some(rest) => rest.trim_end(),
        None => s,
    }
}

fn parse_general(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in &OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let cleaned = s
        .replace(" (UTC)", "")
        .replace(" UTC", "")
        .replace(" +0000", "");
    let cleaned = cleaned.trim();

    for fmt in &NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in &DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(cleaned, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

fn parse_day_month_year(s: &str) -> Option<DateTime<Utc>> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(\d{1,2})[-/ ]([A-Za-z]{3,})[-/ ](\d{4})").unwrap()
    });

    let caps = re.captures(s)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let prefix = caps.get(2)?.as_str().get(..3)?.to_lowercase();
    let month = MONTHS.iter().position(|m| *m == prefix)? as u32 + 1;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;

    let iso = format!("{:04}-{:02}-{:02}T00:00:00Z", year, month, day);
    DateTime::parse_from_rfc3339(&iso)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: i64 = s.parse().ok()?;
    // Values this large are milliseconds, not seconds.
    if value > 100_000_000_000 {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}
