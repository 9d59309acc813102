//! # Reminders Feature
//!
//! The reminder record model, recurrence cadences, and the scheduling
//! engine that fires deliveries.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Jobs addressed by a stored opaque key instead of id+title
//! - 1.0.0: Initial one-shot scheduling

use chrono::{DateTime, Duration, Months, Utc};
use uuid::Uuid;

pub mod scheduler;

pub use scheduler::ReminderScheduler;

/// A persisted reminder. `owner_address` is a comma-joined set once other
/// recipients are attached; the record does not distinguish owner from
/// also-notify after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: i64,
    pub owner_address: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub active: bool,
    /// Stable scheduling key, generated once at creation. The engine only
    /// ever addresses jobs through this, so retitling a reminder can never
    /// orphan its job.
    pub job_key: Uuid,
}

impl Reminder {
    /// The comma-joined delivery set, split back into individual addresses.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.owner_address.split(',').filter(|a| !a.is_empty())
    }
}

/// Units of the recurrence grammar. Minute/day/week step by fixed duration;
/// month steps calendar-aware. The minute unit mostly exists to exercise
/// recurrence quickly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatUnit {
    Minute,
    Day,
    Week,
    Month,
}

impl RepeatUnit {
    /// Accepts singular and plural token forms.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "minute" | "minutes" => Some(RepeatUnit::Minute),
            "day" | "days" => Some(RepeatUnit::Day),
            "week" | "weeks" => Some(RepeatUnit::Week),
            "month" | "months" => Some(RepeatUnit::Month),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatUnit::Minute => "minute",
            RepeatUnit::Day => "day",
            RepeatUnit::Week => "week",
            RepeatUnit::Month => "month",
        }
    }
}

/// A recurrence cadence: fire every `amount` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatEvery {
    pub unit: RepeatUnit,
    pub amount: u32,
}

impl RepeatEvery {
    /// The next fire instant after `from`. Month cadences clamp day-of-month
    /// overflow to the last day of the target month (Jan 31 + 1 month is
    /// Feb 29 on a leap year). `None` only on arithmetic overflow at the
    /// edge of the representable range.
    pub fn advance(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let amount = i64::from(self.amount);
        match self.unit {
            RepeatUnit::Minute => from.checked_add_signed(Duration::try_minutes(amount)?),
            RepeatUnit::Day => from.checked_add_signed(Duration::try_days(amount)?),
            RepeatUnit::Week => from.checked_add_signed(Duration::try_weeks(amount)?),
            RepeatUnit::Month => from.checked_add_months(Months::new(self.amount)),
        }
    }
}
