//! Reply strings for every command outcome
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Usage text now documents the `me ...` shorthand forms
//! - 1.1.0: Extracted from inline strings in command_handler.rs
//! - 1.0.0: Initial reply set
//!
//! The stored/deleted/list strings are pinned by long-standing user habits
//! (and by tests), so their exact wording must not drift. That includes the
//! list message's spelling.

/// Help text returned for `help`, `?` and `halp`.
pub const USAGE: &str = "\
A bot that schedules reminders for users.

To store a reminder, send a message to the bot in one of these forms:

`add <int> <unit> <title_of_reminder>`
`add 1 day clean the dishes`
`add 10 hours eat`

`me <int> <unit>`
`me at <H[:MM]> <am|pm>`
`me at <YYYY-MM-DD> <HH:MM>`

Available time units: minutes, hours, days, weeks

The `me ...` forms accept an optional `--multi @user [@user ...]` suffix to
notify additional people. Their reminder title is a link back to the
conversation the command was sent from.

To remove a reminder:
`remove <reminder_id>`

To list reminders:
`list`

To repeat a reminder:
`repeat <reminder_id> every <int> <unit>`
`repeat 23 every 2 weeks`

Available repeat units: minutes, days, weeks, months

To add recipients to an existing reminder:
`multi <reminder_id> @user [@user ...]`
";

/// Reply for a reminder created from a calendar-date command.
pub fn stored_date_reply(reminder_id: i64, title: &str) -> String {
    format!("Reminder stored. title: {title} Your reminder id is: {reminder_id}. ")
}

/// Reply for a reminder created from a clock-time command.
pub fn stored_clock_reply(reminder_id: i64, title: &str) -> String {
    format!("Reminder stored. Your reminder id is: {reminder_id}. title: {title}")
}

/// Reply for a reminder created from the relative shorthand; the title is a
/// conversation link, which the reply labels as such.
pub fn stored_link_reply(reminder_id: i64, url: &str) -> String {
    format!("Reminder stored. Your reminder id is: {reminder_id}. url: {url}")
}

/// Reply for a reminder created from the verbose add command.
pub fn stored_add_reply(reminder_id: i64) -> String {
    format!("Reminder stored. Your reminder id is: {reminder_id}")
}

pub fn deleted_reply() -> &'static str {
    "Reminder deleted."
}

pub fn not_deleted_reply() -> &'static str {
    "Something went wrong. Reminder not deleted."
}

/// Reply after converting a reminder to a recurring cadence. Echoes the
/// user's own amount and unit tokens.
pub fn repeat_reply(amount: i64, unit_token: &str) -> String {
    format!("Reminder will be repeated every {amount} {unit_token}.")
}

/// Reply after attaching recipients. Echoes the requested usernames in
/// mention decoration, whether or not each one resolved.
pub fn attach_reply(usernames: &[String], reminder_id: i64) -> String {
    let mentions = usernames
        .iter()
        .map(|name| format!("@**{name}**"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Reminder will be sent to {mentions}. Your reminder id is: {reminder_id}.")
}

/// Render the list reply from `(id, title, formatted deadline)` rows.
pub fn reminders_list_reply(rows: &[(i64, String, String)]) -> String {
    if rows.is_empty() {
        return "No reminders avaliable.".to_string();
    }
    rows.iter()
        .map(|(id, title, deadline)| {
            format!("Reminder id {id}, titled {title}, is scheduled on {deadline}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn error_reply() -> &'static str {
    "Something went wrong"
}

pub fn invalid_reply() -> &'static str {
    "Invalid input. Please check help."
}
