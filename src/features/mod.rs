// Feature modules

pub mod delivery;
pub mod recipients;
pub mod reminders;

// Re-export commonly used items
pub use delivery::{ConsoleTransport, DeliveryTransport, WebhookTransport};
pub use recipients::{RecipientDirectory, Resolution, StaticDirectory};
pub use reminders::{Reminder, ReminderScheduler, RepeatEvery, RepeatUnit};
