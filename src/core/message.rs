//! Inbound message model
//!
//! The front door (console, or whatever chat integration feeds the bot)
//! normalizes every incoming message into [`ChatMessage`] before the command
//! layer sees it. The conversation context carries what deep-link synthesis
//! needs: channel messages have an id/name/topic, direct messages have the
//! other participants.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use chrono::{DateTime, Utc};

/// Where a message was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversation {
    /// A named channel; `topic` is the thread/subject within it.
    Channel {
        id: u64,
        name: String,
        topic: String,
    },
    /// A direct exchange; `participants` are the other parties' addresses,
    /// in the order the platform presented them.
    Direct { participants: Vec<String> },
}

/// A single inbound message, normalized by the front door.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Authenticated address of the sender
    pub sender_address: String,
    /// Raw message text
    pub content: String,
    /// Instant the message was submitted
    pub timestamp: DateTime<Utc>,
    /// Platform message id, used for deep links
    pub message_id: u64,
    /// Conversation the message arrived in
    pub conversation: Conversation,
}

impl ChatMessage {
    /// Trimmed message text, which is what the command grammar matches on.
    pub fn trimmed(&self) -> &str {
        self.content.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trimmed_strips_surrounding_whitespace() {
        let msg = ChatMessage {
            sender_address: "a@example.com".to_string(),
            content: "  list \n".to_string(),
            timestamp: Utc::now(),
            message_id: 1,
            conversation: Conversation::Direct {
                participants: vec!["b@example.com".to_string()],
            },
        };
        assert_eq!(msg.trimmed(), "list");
    }
}
