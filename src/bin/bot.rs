use anyhow::Result;
use chrono::Utc;
use dotenvy::dotenv;
use log::info;
use std::sync::Arc;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};

use nudge::command_handler::CommandHandler;
use nudge::core::message::{ChatMessage, Conversation};
use nudge::core::Config;
use nudge::database::Database;
use nudge::features::delivery::{ConsoleTransport, DeliveryTransport, WebhookTransport};
use nudge::features::recipients::StaticDirectory;
use nudge::features::reminders::ReminderScheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Nudge reminder bot...");

    let database = Database::new(&config.database_path).await?;

    let directory = StaticDirectory::load_or_empty(&config.directory_path);
    info!(
        "📇 Recipient directory loaded with {} entries",
        directory.len()
    );

    let transport: Arc<dyn DeliveryTransport> = match &config.webhook_url {
        Some(url) => {
            info!("📤 Delivering reminders to webhook at {url}");
            Arc::new(WebhookTransport::new(url.clone()))
        }
        None => {
            info!("📤 No webhook configured, delivering reminders to the console");
            Arc::new(ConsoleTransport)
        }
    };

    let scheduler = ReminderScheduler::new(database.clone(), transport);
    let restored = scheduler.restore().await?;
    info!("⏰ Re-armed {restored} stored reminder(s)");

    let handler = CommandHandler::new(
        database,
        scheduler.clone(),
        Arc::new(directory),
        config.timezone,
        config.chat_base_url.clone(),
    );

    info!(
        "Ready. Reading commands from stdin as {} (Ctrl-D to exit)",
        config.console_address
    );

    // Line-oriented front door: every stdin line is one inbound message
    // from the configured console identity.
    let mut lines = BufReader::new(stdin()).lines();
    let mut message_id: u64 = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        message_id += 1;
        let message = ChatMessage {
            sender_address: config.console_address.clone(),
            content: line,
            timestamp: Utc::now(),
            message_id,
            conversation: Conversation::Direct {
                participants: vec![config.console_address.clone()],
            },
        };
        let reply = handler.handle_message(&message).await;
        println!("{reply}");
    }

    info!("Input closed, shutting down timers...");
    scheduler.shutdown();

    Ok(())
}
