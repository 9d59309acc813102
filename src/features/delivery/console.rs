//! Console delivery: prints reminders to stdout. Used by the local front
//! door when no webhook is configured.

use anyhow::Result;
use async_trait::async_trait;
use log::info;

use super::DeliveryTransport;

pub struct ConsoleTransport;

#[async_trait]
impl DeliveryTransport for ConsoleTransport {
    async fn send(&self, address: &str, title: &str) -> Result<()> {
        println!("Reminder for {address}: {title}");
        info!("Delivered to {address} on console");
        Ok(())
    }
}
