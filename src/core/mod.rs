//! # Core Module
//!
//! Core domain types, configuration, and reply formatting for the nudge bot.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Add message module with the normalized inbound message model
//! - 1.1.0: Add response module with the user-facing reply strings
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod message;
pub mod response;

// Re-export commonly used items
pub use config::Config;
pub use message::{ChatMessage, Conversation};
