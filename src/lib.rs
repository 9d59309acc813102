// Core layer - shared types and configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Infrastructure (to be reorganized)
pub mod database;

// Application layer
pub mod command_handler;
pub mod commands;

// Re-export core config for backwards compatibility
pub use crate::core::Config;

// Re-export feature items for backwards compatibility
pub use features::{
    // Delivery
    ConsoleTransport, DeliveryTransport, WebhookTransport,
    // Recipients
    RecipientDirectory, StaticDirectory,
    // Reminders
    Reminder, ReminderScheduler, RepeatEvery, RepeatUnit,
};

// Re-export the application surface
pub use command_handler::{CommandHandler, OpError};
pub use database::Database;
