//! Deep links back to the originating conversation
//!
//! Shorthand reminders have no title of their own; their title is a link the
//! recipient can follow to the exact message that created the reminder.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use crate::core::message::{ChatMessage, Conversation};

/// Build the `#narrow` link for the message's conversation.
///
/// Channel messages link to `stream/{id}-{name}/subject/{topic}`; direct
/// messages link to `pm-with/{participants}` with the participants reversed
/// from their given order (kept for compatibility with links already in the
/// wild). Every path segment is percent-encoded, slashes between segments
/// stay literal.
pub fn conversation_link(base_url: &str, message: &ChatMessage) -> String {
    let path = match &message.conversation {
        Conversation::Channel { id, name, topic } => {
            format!("stream/{id}-{name}/subject/{topic}")
        }
        Conversation::Direct { participants } => {
            let involved = participants
                .iter()
                .rev()
                .cloned()
                .collect::<Vec<_>>()
                .join(",");
            format!("pm-with/{involved}")
        }
    };
    let path = format!("{path}/near/{}", message.message_id);
    let quoted = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{base_url}/#narrow/{quoted}")
}
