//! # Feature: Time Expression Resolution
//!
//! Converts the grammar's time tokens into absolute UTC instants: relative
//! offsets ("20 minutes"), same-day clock times ("7:30 pm") and calendar
//! datetimes ("2024-05-01 09:00"). Clock and calendar forms are interpreted
//! on the configured zone's wall clock.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Zone-aware clock/calendar resolution with DST handling
//! - 1.0.0: Initial fixed-length relative offsets

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Why a time expression failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("unrecognized time unit '{0}'")]
    InvalidUnit(String),
    #[error("amount is out of the representable range")]
    InvalidAmount,
    #[error("clock time does not exist")]
    InvalidClockTime,
    #[error("invalid calendar date or time")]
    InvalidDate,
    #[error("resolved instant is not in the future")]
    PastTime,
}

/// Fixed-length units of the relative grammar. Months are deliberately
/// absent; they exist only in the recurrence grammar, which steps
/// calendar-aware (see the scheduler's cadence type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeUnit {
    Minute,
    Hour,
    Day,
    Week,
}

impl RelativeUnit {
    /// Accepts singular and plural token forms.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "minute" | "minutes" => Some(RelativeUnit::Minute),
            "hour" | "hours" => Some(RelativeUnit::Hour),
            "day" | "days" => Some(RelativeUnit::Day),
            "week" | "weeks" => Some(RelativeUnit::Week),
            _ => None,
        }
    }
}

/// am/pm marker, matched case-insensitively by the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

impl Meridiem {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "am" => Some(Meridiem::Am),
            "pm" => Some(Meridiem::Pm),
            _ => None,
        }
    }
}

/// `submitted_at + amount * unit`, exactly. No future check here: callers
/// gate on [`ensure_future`] so that classification owns the rejection.
pub fn resolve_relative(
    submitted_at: DateTime<Utc>,
    amount: i64,
    unit_token: &str,
) -> Result<DateTime<Utc>, TimeError> {
    let unit = RelativeUnit::parse(unit_token)
        .ok_or_else(|| TimeError::InvalidUnit(unit_token.to_string()))?;
    let delta = match unit {
        RelativeUnit::Minute => Duration::try_minutes(amount),
        RelativeUnit::Hour => Duration::try_hours(amount),
        RelativeUnit::Day => Duration::try_days(amount),
        RelativeUnit::Week => Duration::try_weeks(amount),
    }
    .ok_or(TimeError::InvalidAmount)?;
    submitted_at
        .checked_add_signed(delta)
        .ok_or(TimeError::InvalidAmount)
}

/// Resolve a 12-hour clock time on the submitter's current local date.
///
/// Meridiem handling keeps the legacy convention: pm adds 12 to the literal
/// hour token and wraps at 24, am uses the token unmodified. "12 pm" is not
/// normalized to noon; it wraps to hour 0 and the past gate rejects it.
/// "12 am" resolves to noon. A clock time at or before `submitted_at` is
/// rejected outright, never reinterpreted as tomorrow.
pub fn resolve_clock_time(
    submitted_at: DateTime<Utc>,
    tz: Tz,
    hour_token: u32,
    minute_token: Option<u32>,
    meridiem: Meridiem,
) -> Result<DateTime<Utc>, TimeError> {
    let hour = match meridiem {
        Meridiem::Am => hour_token,
        Meridiem::Pm => (hour_token + 12) % 24,
    };
    let minute = minute_token.unwrap_or(0);
    let local_date = submitted_at.with_timezone(&tz).date_naive();
    let naive = local_date
        .and_hms_opt(hour, minute, 0)
        .ok_or(TimeError::InvalidClockTime)?;
    let resolved = local_to_utc(tz, naive)?;
    ensure_future(resolved, submitted_at)
}

/// Resolve a strict `YYYY-MM-DD HH:MM` pair on the configured zone's wall
/// clock. Calendar-impossible dates (2021-02-29) are `InvalidDate`.
pub fn resolve_calendar_datetime(
    submitted_at: DateTime<Utc>,
    tz: Tz,
    date_token: &str,
    time_token: &str,
) -> Result<DateTime<Utc>, TimeError> {
    let date = NaiveDate::parse_from_str(date_token, "%Y-%m-%d")
        .map_err(|_| TimeError::InvalidDate)?;
    let time = NaiveTime::parse_from_str(time_token, "%H:%M")
        .map_err(|_| TimeError::InvalidDate)?;
    let resolved = local_to_utc(tz, date.and_time(time))?;
    ensure_future(resolved, submitted_at)
}

/// The strictly-future gate every deadline-producing intent passes through.
pub fn ensure_future(
    resolved: DateTime<Utc>,
    submitted_at: DateTime<Utc>,
) -> Result<DateTime<Utc>, TimeError> {
    if resolved > submitted_at {
        Ok(resolved)
    } else {
        Err(TimeError::PastTime)
    }
}

/// Map a local wall-clock time to UTC. DST gap times do not exist and are
/// rejected; ambiguous fall-back times take the earlier offset.
fn local_to_utc(tz: Tz, naive: NaiveDateTime) -> Result<DateTime<Utc>, TimeError> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(TimeError::InvalidClockTime),
    }
}
