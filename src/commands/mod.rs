//! # Command System
//!
//! Message command handling: grammar classification, time resolution, and
//! request extraction.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Split classification from extraction, typed time errors
//! - 1.0.0: Initial command grammars

pub mod classifier;
pub mod extractor;
pub mod link;
pub mod timeexpr;

// Re-export the CommandHandler from the handler module
pub use crate::command_handler::CommandHandler;

// Re-export commonly used items from submodules
pub use classifier::{classify, Intent};
pub use extractor::{classify_and_extract, Command, CreateRequest, CreatedVia};
pub use link::conversation_link;
pub use timeexpr::TimeError;
