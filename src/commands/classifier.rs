//! # Feature: Command Classification
//!
//! Decides which command intent (if any) a raw message matches. Grammars
//! overlap, so rules are tried in a fixed priority order and the first match
//! wins. Time-bearing intents only match when their instant resolves to a
//! strictly-future time; a stale or unresolvable time command therefore
//! falls through the remaining rules and normally ends `Unrecognized`.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Deadline resolution moved into classification; intents carry
//!   their resolved instants so extraction cannot re-tokenize differently
//! - 1.1.0: Legacy `multiremind` keyword accepted alongside `multi`
//! - 1.0.0: Initial grammar set

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::commands::timeexpr::{self, Meridiem};
use crate::features::reminders::{RepeatEvery, RepeatUnit};

/// A classified command. Time-bearing intents carry the already-validated
/// deadline; the extractor must not recompute it.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// `me at YYYY-MM-DD HH:MM [--multi @user ...]`
    CalendarDate {
        deadline: DateTime<Utc>,
        multi_clause: Option<String>,
    },
    /// `me at H[:MM] am|pm [--multi @user ...]`
    ClockTime {
        deadline: DateTime<Utc>,
        multi_clause: Option<String>,
    },
    /// `me <amount> <unit> [--multi @user ...]`
    Relative {
        deadline: DateTime<Utc>,
        multi_clause: Option<String>,
    },
    /// `add <amount> <unit> <title>`
    Add {
        deadline: DateTime<Utc>,
        title: String,
    },
    /// `remove <id>`
    Remove { reminder_id: i64 },
    /// `list`
    List,
    /// `repeat <id> every <amount> <unit>`
    Repeat {
        reminder_id: i64,
        every: RepeatEvery,
        amount_token: i64,
        unit_token: String,
    },
    /// `multi <id> @user ...` (or legacy `multiremind`)
    Attach {
        reminder_id: i64,
        mention_blob: String,
    },
    /// `help` / `?` / `halp` prefix
    Help,
    Unrecognized,
}

/// Classify trimmed message text against the fixed priority order.
pub fn classify(content: &str, submitted_at: DateTime<Utc>, tz: Tz) -> Intent {
    let content = content.trim();
    if content.starts_with("help") || content.starts_with('?') || content.starts_with("halp") {
        return Intent::Help;
    }
    if let Some(intent) = try_calendar_date(content, submitted_at, tz) {
        return intent;
    }
    if let Some(intent) = try_clock_time(content, submitted_at, tz) {
        return intent;
    }
    if let Some(intent) = try_relative(content, submitted_at) {
        return intent;
    }
    if let Some(intent) = try_add(content, submitted_at) {
        return intent;
    }
    if let Some(intent) = try_remove(content) {
        return intent;
    }
    if let Some(intent) = try_list(content) {
        return intent;
    }
    if let Some(intent) = try_repeat(content) {
        return intent;
    }
    if let Some(intent) = try_attach(content) {
        return intent;
    }
    Intent::Unrecognized
}

// Patterns 1-3 anchor at the start only; trailing text past the grammar is
// tolerated, as the legacy matcher did.

fn try_calendar_date(content: &str, submitted_at: DateTime<Utc>, tz: Tz) -> Option<Intent> {
    let re = Regex::new(
        r"^me at (\d{4}-\d{2}-\d{2}) (\d{2}:\d{2})(?:\s+--multi\s+((?:@\w+\s*)+))?",
    )
    .ok()?;
    let caps = re.captures(content)?;
    let deadline =
        timeexpr::resolve_calendar_datetime(submitted_at, tz, &caps[1], &caps[2]).ok()?;
    Some(Intent::CalendarDate {
        deadline,
        multi_clause: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

fn try_clock_time(content: &str, submitted_at: DateTime<Utc>, tz: Tz) -> Option<Intent> {
    let re = Regex::new(
        r"^me at (\d{1,2})(?::(\d{2}))?\s*((?i:am|pm))(?:\s+--multi\s+((?:@\w+\s*)+))?",
    )
    .ok()?;
    let caps = re.captures(content)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: Option<u32> = match caps.get(2) {
        Some(m) => Some(m.as_str().parse().ok()?),
        None => None,
    };
    let meridiem = Meridiem::parse(&caps[3])?;
    let deadline = timeexpr::resolve_clock_time(submitted_at, tz, hour, minute, meridiem).ok()?;
    Some(Intent::ClockTime {
        deadline,
        multi_clause: caps.get(4).map(|m| m.as_str().to_string()),
    })
}

fn try_relative(content: &str, submitted_at: DateTime<Utc>) -> Option<Intent> {
    let re = Regex::new(r"^me\s+(\d+)\s+(\w+)(?:\s+--multi\s+((?:@\w+\s*)+))?").ok()?;
    let caps = re.captures(content)?;
    let amount: i64 = caps[1].parse().ok()?;
    let resolved = timeexpr::resolve_relative(submitted_at, amount, &caps[2]).ok()?;
    let deadline = timeexpr::ensure_future(resolved, submitted_at).ok()?;
    Some(Intent::Relative {
        deadline,
        multi_clause: caps.get(3).map(|m| m.as_str().to_string()),
    })
}

fn try_add(content: &str, submitted_at: DateTime<Utc>) -> Option<Intent> {
    let parts: Vec<&str> = content.splitn(4, ' ').collect();
    if parts.len() < 4 || parts[0] != "add" {
        return None;
    }
    let amount: i64 = parts[1].parse().ok()?;
    let resolved = timeexpr::resolve_relative(submitted_at, amount, parts[2]).ok()?;
    let deadline = timeexpr::ensure_future(resolved, submitted_at).ok()?;
    Some(Intent::Add {
        deadline,
        title: parts[3].to_string(),
    })
}

fn try_remove(content: &str) -> Option<Intent> {
    let parts: Vec<&str> = content.split(' ').collect();
    if parts.first() != Some(&"remove") {
        return None;
    }
    let reminder_id: i64 = parts.get(1)?.parse().ok()?;
    Some(Intent::Remove { reminder_id })
}

fn try_list(content: &str) -> Option<Intent> {
    let parts: Vec<&str> = content.split(' ').collect();
    if parts.first() == Some(&"list") {
        Some(Intent::List)
    } else {
        None
    }
}

fn try_repeat(content: &str) -> Option<Intent> {
    let parts: Vec<&str> = content.split(' ').collect();
    if parts.first() != Some(&"repeat") || parts.get(2) != Some(&"every") {
        return None;
    }
    let reminder_id: i64 = parts.get(1)?.parse().ok()?;
    let amount: i64 = parts.get(3)?.parse().ok()?;
    let unit_token = *parts.get(4)?;
    let unit = RepeatUnit::parse(unit_token)?;
    if amount < 1 {
        return None;
    }
    let every = RepeatEvery {
        unit,
        amount: u32::try_from(amount).ok()?,
    };
    Some(Intent::Repeat {
        reminder_id,
        every,
        amount_token: amount,
        unit_token: unit_token.to_string(),
    })
}

fn try_attach(content: &str) -> Option<Intent> {
    let parts: Vec<&str> = content.splitn(3, ' ').collect();
    let keyword = *parts.first()?;
    if keyword != "multi" && keyword != "multiremind" {
        return None;
    }
    let reminder_id: i64 = parts.get(1)?.parse().ok()?;
    let mention_blob = parts.get(2)?.trim();
    if mention_blob.is_empty() {
        return None;
    }
    Some(Intent::Attach {
        reminder_id,
        mention_blob: mention_blob.to_string(),
    })
}
