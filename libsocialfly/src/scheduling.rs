//! Schedule time parsing
//!
//! Posts can be scheduled with relative durations ("30m", "2h"), natural
//! language ("tomorrow", "next friday 10am"), or absolute timestamps
//! ("2026-09-01 15:00", RFC 3339).

use crate::{Result, SocialFlyError};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

/// Parse a schedule string into a UTC time.
///
/// # Errors
///
/// Returns `InvalidInput` if the string cannot be parsed in any supported
/// format, or if the resulting time is in the past.
pub fn parse_schedule(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SocialFlyError::InvalidInput(
            "Schedule string cannot be empty".to_string(),
        ));
    }

    let when = parse_any(input)?;

    if when <= Utc::now() {
        return Err(SocialFlyError::InvalidInput(format!(
            "Scheduled time is in the past: {}",
            when.to_rfc3339()
        )));
    }

    Ok(when)
}

fn parse_any(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(duration) = parse_duration(input) {
        return Ok(Utc::now() + duration);
    }

    if let Ok(dt) = parse_absolute(input) {
        return Ok(dt);
    }

    if let Ok(dt) = parse_natural_language(input) {
        return Ok(dt);
    }

    Err(SocialFlyError::InvalidInput(format!(
        "Could not parse schedule string: {}",
        input
    )))
}

/// Parse a relative duration like "30m", "2h", "1 day".
fn parse_duration(input: &str) -> Result<Duration> {
    if let Ok(std_duration) = humantime::parse_duration(input) {
        let seconds = std_duration.as_secs() as i64;
        return Duration::try_seconds(seconds)
            .ok_or_else(|| SocialFlyError::InvalidInput("Duration out of range".to_string()));
    }

    Err(SocialFlyError::InvalidInput(format!(
        "Could not parse duration: {}",
        input
    )))
}

/// Parse RFC 3339 or "YYYY-MM-DD HH:MM" (interpreted as UTC).
fn parse_absolute(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(SocialFlyError::InvalidInput(format!(
        "Could not parse timestamp: {}",
        input
    )))
}

fn parse_natural_language(input: &str) -> Result<DateTime<Utc>> {
    chrono_english::parse_date_string(input, Utc::now(), chrono_english::Dialect::Us)
        .map_err(|e| SocialFlyError::InvalidInput(format!("Could not parse time: {}", e)))
}
