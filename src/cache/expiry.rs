//! Expiry Module
//!
//! Converts relative durations, instants and date strings into absolute
//! expiration timestamps.

use std::time::Duration as StdDuration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{CacheError, Result};

/// Expiration instant meaning "never expires": 9999-12-31T23:59:59Z in Unix milliseconds.
pub const MAX_EXPIRY_MS: i64 = 253_402_300_799_000;

/// Returns the instant used for entries that never expire.
pub fn max_expiry() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(MAX_EXPIRY_MS).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// == Expiry ==
/// When an entry stops being live.
#[derive(Debug, Clone, PartialEq)]
pub enum Expiry {
    /// Live until removed
    Never,
    /// Live for this many seconds after being written; non-finite means never
    Seconds(f64),
    /// Live until this instant
    At(DateTime<Utc>),
    /// Live until the instant this date string describes
    Text(String),
}

impl Default for Expiry {
    fn default() -> Self {
        Expiry::Never
    }
}

impl Expiry {
    // == Resolve ==
    /// Computes the absolute expiration as Unix milliseconds relative to `now`.
    ///
    /// Results past [`MAX_EXPIRY_MS`] are clamped to it.
    pub fn resolve_ms(&self, now: DateTime<Utc>) -> Result<i64> {
        let expires = match self {
            Expiry::Never => MAX_EXPIRY_MS,
            Expiry::Seconds(secs) if !secs.is_finite() => MAX_EXPIRY_MS,
            Expiry::Seconds(secs) => {
                let target = now.timestamp_millis() as f64 + secs * 1000.0;
                target.min(MAX_EXPIRY_MS as f64) as i64
            }
            Expiry::At(at) => at.timestamp_millis(),
            Expiry::Text(text) => parse_date(text)
                .ok_or_else(|| {
                    CacheError::InvalidExpiry(format!(
                        "'{}' cannot be converted to a valid date",
                        text
                    ))
                })?
                .timestamp_millis(),
        };
        Ok(expires.min(MAX_EXPIRY_MS))
    }
}

// == Date Parsing ==
/// Parses the date formats accepted for [`Expiry::Text`]. Naive forms are read as UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// == Conversions ==
impl From<f64> for Expiry {
    fn from(secs: f64) -> Self {
        Expiry::Seconds(secs)
    }
}

macro_rules! expiry_from_seconds {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expiry {
                fn from(secs: $t) -> Self {
                    Expiry::Seconds(secs as f64)
                }
            }
        )*
    };
}

expiry_from_seconds!(i32, i64, u32, u64);

impl From<StdDuration> for Expiry {
    fn from(duration: StdDuration) -> Self {
        Expiry::Seconds(duration.as_secs_f64())
    }
}

impl From<DateTime<Utc>> for Expiry {
    fn from(at: DateTime<Utc>) -> Self {
        Expiry::At(at)
    }
}

impl From<&str> for Expiry {
    fn from(text: &str) -> Self {
        Expiry::Text(text.to_string())
    }
}

impl From<String> for Expiry {
    fn from(text: String) -> Self {
        Expiry::Text(text)
    }
}
