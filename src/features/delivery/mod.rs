//! # Feature: Delivery Transports
//!
//! How a fired reminder reaches its recipients. The scheduling engine only
//! knows the `DeliveryTransport` trait; the binary picks the concrete
//! transport at startup (webhook when `WEBHOOK_URL` is set, console
//! otherwise).
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.4.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Console transport for the local front door
//! - 1.0.0: Webhook delivery behind a trait

use anyhow::Result;
use async_trait::async_trait;

pub mod console;
pub mod webhook;

pub use console::ConsoleTransport;
pub use webhook::WebhookTransport;

/// One delivery sink. `send` is called once per recipient address; a
/// failure for one address must not affect the others, so implementations
/// report errors instead of panicking.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Deliver `title` to a single recipient `address`.
    async fn send(&self, address: &str, title: &str) -> Result<()>;
}
