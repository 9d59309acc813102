//! # Feature: Request Extraction
//!
//! Turns a classified intent plus the originating message into the
//! structured request the command layer acts on. Creation intents get their
//! title here: a literal one for verbose add, a synthesized conversation
//! link for the shorthand forms. Multi-recipient clauses are resolved
//! against the directory; names that do not resolve are logged and dropped,
//! the request itself still goes through.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Unresolved recipient names are logged instead of vanishing
//! - 1.0.0: Initial extraction

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::warn;

use crate::commands::classifier::{self, Intent};
use crate::commands::link;
use crate::core::message::ChatMessage;
use crate::features::recipients::{self, RecipientDirectory};
use crate::features::reminders::RepeatEvery;

/// Which grammar created a reminder; decides the wording of the stored
/// reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedVia {
    CalendarDate,
    ClockTime,
    Shorthand,
    Add,
}

/// A creation request, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub requester_address: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    /// Resolved recipient addresses beyond the requester
    pub recipients: Vec<String>,
    pub is_multi: bool,
    pub via: CreatedVia,
}

/// The fully-extracted command, one variant per intent plus the fallthrough.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create(CreateRequest),
    Remove {
        reminder_id: i64,
    },
    List,
    Repeat {
        reminder_id: i64,
        every: RepeatEvery,
        amount_token: i64,
        unit_token: String,
    },
    Attach {
        reminder_id: i64,
        usernames: Vec<String>,
    },
    Help,
    Unrecognized,
}

/// Classify the message and build its structured command.
pub fn classify_and_extract(
    message: &ChatMessage,
    tz: Tz,
    base_url: &str,
    directory: &dyn RecipientDirectory,
) -> Command {
    match classifier::classify(message.trimmed(), message.timestamp, tz) {
        Intent::CalendarDate { deadline, multi_clause } => Command::Create(build_create(
            message,
            deadline,
            multi_clause,
            CreatedVia::CalendarDate,
            base_url,
            directory,
        )),
        Intent::ClockTime { deadline, multi_clause } => Command::Create(build_create(
            message,
            deadline,
            multi_clause,
            CreatedVia::ClockTime,
            base_url,
            directory,
        )),
        Intent::Relative { deadline, multi_clause } => Command::Create(build_create(
            message,
            deadline,
            multi_clause,
            CreatedVia::Shorthand,
            base_url,
            directory,
        )),
        Intent::Add { deadline, title } => Command::Create(CreateRequest {
            requester_address: message.sender_address.clone(),
            title,
            created_at: message.timestamp,
            deadline,
            recipients: Vec::new(),
            is_multi: false,
            via: CreatedVia::Add,
        }),
        Intent::Remove { reminder_id } => Command::Remove { reminder_id },
        Intent::List => Command::List,
        Intent::Repeat {
            reminder_id,
            every,
            amount_token,
            unit_token,
        } => Command::Repeat {
            reminder_id,
            every,
            amount_token,
            unit_token,
        },
        Intent::Attach { reminder_id, mention_blob } => Command::Attach {
            reminder_id,
            usernames: split_mentions(&mention_blob),
        },
        Intent::Help => Command::Help,
        Intent::Unrecognized => Command::Unrecognized,
    }
}

fn build_create(
    message: &ChatMessage,
    deadline: DateTime<Utc>,
    multi_clause: Option<String>,
    via: CreatedVia,
    base_url: &str,
    directory: &dyn RecipientDirectory,
) -> CreateRequest {
    let (recipients, is_multi) = match multi_clause {
        Some(blob) => {
            let usernames = split_mentions(&blob);
            let resolution = recipients::resolve(directory, &usernames);
            if resolution.is_partial() {
                warn!(
                    "unresolved recipients for {}: {:?}",
                    message.sender_address, resolution.unresolved
                );
            }
            (resolution.resolved, true)
        }
        None => (Vec::new(), false),
    };
    CreateRequest {
        requester_address: message.sender_address.clone(),
        title: link::conversation_link(base_url, message),
        created_at: message.timestamp,
        deadline,
        recipients,
        is_multi,
        via,
    }
}

/// Strip mention decoration (`@`, `*`) and split into bare usernames.
/// Handles both space-separated and run-together mention lists, since `@`
/// itself acts as a separator once replaced.
fn split_mentions(blob: &str) -> Vec<String> {
    blob.replace('*', "")
        .replace('@', " ")
        .split_whitespace()
        .map(|name| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Conversation;
    use chrono::TimeZone;

    const BASE: &str = "https://chat.example.com";

    struct OneUser;

    impl RecipientDirectory for OneUser {
        fn lookup(&self, username: &str) -> Option<String> {
            (username == "juan").then(|| "juan@example.com".to_string())
        }
    }

    fn message(content: &str) -> ChatMessage {
        ChatMessage {
            sender_address: "sender@example.com".to_string(),
            content: content.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 4, 19, 12, 0, 0).unwrap(),
            message_id: 42,
            conversation: Conversation::Channel {
                id: 99,
                name: "general".to_string(),
                topic: "daily".to_string(),
            },
        }
    }

    #[test]
    fn test_split_mentions_strips_decoration() {
        assert_eq!(split_mentions("@**Jose** @**Max**"), vec!["Jose", "Max"]);
        assert_eq!(split_mentions("@juan@carolina"), vec!["juan", "carolina"]);
        assert_eq!(split_mentions("hello"), vec!["hello"]);
    }

    #[test]
    fn test_shorthand_title_is_conversation_link() {
        let msg = message("me 20 minutes");
        match classify_and_extract(&msg, Tz::UTC, BASE, &OneUser) {
            Command::Create(request) => {
                assert_eq!(request.via, CreatedVia::Shorthand);
                assert_eq!(
                    request.title,
                    "https://chat.example.com/#narrow/stream/99-general/subject/daily/near/42"
                );
                assert_eq!(request.requester_address, "sender@example.com");
                assert_eq!(request.deadline, msg.timestamp + chrono::Duration::minutes(20));
                assert!(request.recipients.is_empty());
                assert!(!request.is_multi);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_multi_clause_resolves_and_drops_unknown() {
        let msg = message("me 20 minutes --multi @juan @ghost");
        match classify_and_extract(&msg, Tz::UTC, BASE, &OneUser) {
            Command::Create(request) => {
                assert!(request.is_multi);
                // ghost did not resolve; the request still goes through
                assert_eq!(request.recipients, vec!["juan@example.com"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_mentions_pass_through() {
        let msg = message("me 20 minutes --multi @juan @juan");
        match classify_and_extract(&msg, Tz::UTC, BASE, &OneUser) {
            Command::Create(request) => {
                assert_eq!(
                    request.recipients,
                    vec!["juan@example.com", "juan@example.com"]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_add_uses_literal_title() {
        let msg = message("add 1 day clean the dishes");
        match classify_and_extract(&msg, Tz::UTC, BASE, &OneUser) {
            Command::Create(request) => {
                assert_eq!(request.via, CreatedVia::Add);
                assert_eq!(request.title, "clean the dishes");
                assert!(!request.is_multi);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_creation_intents_map_straight_through() {
        assert_eq!(
            classify_and_extract(&message("remove 5"), Tz::UTC, BASE, &OneUser),
            Command::Remove { reminder_id: 5 }
        );
        assert_eq!(
            classify_and_extract(&message("list"), Tz::UTC, BASE, &OneUser),
            Command::List
        );
        assert_eq!(
            classify_and_extract(&message("gibberish"), Tz::UTC, BASE, &OneUser),
            Command::Unrecognized
        );
    }

    #[test]
    fn test_attach_usernames_extracted_from_blob() {
        match classify_and_extract(&message("multi 23 @**Jose** @**Max**"), Tz::UTC, BASE, &OneUser)
        {
            Command::Attach { reminder_id, usernames } => {
                assert_eq!(reminder_id, 23);
                assert_eq!(usernames, vec!["Jose", "Max"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
