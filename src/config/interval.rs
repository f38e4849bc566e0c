//! Human-readable relative interval parsing.
//!
//! Intervals are one or more `<number> <unit>` pairs, e.g. `"5 seconds"`,
//! `"1 hour 30 minutes"` or `"250ms"`. Months count as 30 days and years as
//! 365 days. Parsing happens once at load time; assembly only sees
//! [`Duration`] values.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_WEEK: u64 = 7 * SECONDS_PER_DAY;
const SECONDS_PER_MONTH: u64 = 30 * SECONDS_PER_DAY;
const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Parse an interval string, returning `None` when it is malformed
pub fn parse_interval(input: &str) -> Option<Duration> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed).trim_start();
    if body.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    let mut rest = body;

    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let amount: u64 = rest[..digits].parse().ok()?;
        rest = rest[digits..].trim_start();

        let unit_len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        if unit_len == 0 {
            return None;
        }
        let unit = unit_duration(&rest[..unit_len].to_ascii_lowercase())?;
        rest = rest[unit_len..].trim_start();

        let part = unit.checked_mul(u32::try_from(amount).ok()?)?;
        total = total.checked_add(part)?;
    }

    Some(total)
}

fn unit_duration(unit: &str) -> Option<Duration> {
    let duration = match unit {
        "usec" | "usecs" | "us" | "microsecond" | "microseconds" => Duration::from_micros(1),
        "msec" | "msecs" | "ms" | "millisecond" | "milliseconds" => Duration::from_millis(1),
        "s" | "sec" | "secs" | "second" | "seconds" => Duration::from_secs(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Duration::from_secs(SECONDS_PER_MINUTE),
        "h" | "hour" | "hours" => Duration::from_secs(SECONDS_PER_HOUR),
        "d" | "day" | "days" => Duration::from_secs(SECONDS_PER_DAY),
        "w" | "week" | "weeks" => Duration::from_secs(SECONDS_PER_WEEK),
        "fortnight" | "fortnights" => Duration::from_secs(2 * SECONDS_PER_WEEK),
        "month" | "months" => Duration::from_secs(SECONDS_PER_MONTH),
        "y" | "year" | "years" => Duration::from_secs(SECONDS_PER_YEAR),
        _ => return None,
    };
    Some(duration)
}

/// Unit of a gRPC timeout value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalFormat {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl IntervalFormat {
    /// Convert `value` units of this format to a duration
    pub fn to_duration(self, value: u64) -> Duration {
        let secs = |per: u64| Duration::from_secs(value.saturating_mul(per));
        match self {
            IntervalFormat::Nanoseconds => Duration::from_nanos(value),
            IntervalFormat::Microseconds => Duration::from_micros(value),
            IntervalFormat::Milliseconds => Duration::from_millis(value),
            IntervalFormat::Seconds => secs(1),
            IntervalFormat::Minutes => secs(SECONDS_PER_MINUTE),
            IntervalFormat::Hours => secs(SECONDS_PER_HOUR),
            IntervalFormat::Days => secs(SECONDS_PER_DAY),
            IntervalFormat::Weeks => secs(SECONDS_PER_WEEK),
            IntervalFormat::Months => secs(SECONDS_PER_MONTH),
            IntervalFormat::Years => secs(SECONDS_PER_YEAR),
        }
    }
}
