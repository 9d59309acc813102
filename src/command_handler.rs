use crate::commands::extractor::{classify_and_extract, Command, CreateRequest, CreatedVia};
use crate::core::message::ChatMessage;
use crate::core::response;
use crate::database::Database;
use crate::features::recipients::{self, RecipientDirectory};
use crate::features::reminders::{Reminder, ReminderScheduler, RepeatEvery};
use chrono_tz::Tz;
use log::{debug, error, info, warn};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Failures of the reminder operations. `NotFound` is the only variant a
/// user command can trigger on its own; everything else rides on `Storage`.
#[derive(Debug, Error)]
pub enum OpError {
    #[error("no reminder with id {0}")]
    NotFound(i64),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct CommandHandler {
    database: Database,
    scheduler: ReminderScheduler,
    directory: Arc<dyn RecipientDirectory>,
    timezone: Tz,
    chat_base_url: String,
}

impl CommandHandler {
    pub fn new(
        database: Database,
        scheduler: ReminderScheduler,
        directory: Arc<dyn RecipientDirectory>,
        timezone: Tz,
        chat_base_url: String,
    ) -> Self {
        CommandHandler {
            database,
            scheduler,
            directory,
            timezone,
            chat_base_url,
        }
    }

    /// Map one inbound message to exactly one reply string. Never panics on
    /// user input; anything unrecognized gets the generic invalid reply.
    pub async fn handle_message(&self, message: &ChatMessage) -> String {
        let request_id = Uuid::new_v4();
        info!(
            "[{}] 📥 Message received | Sender: {} | Content: '{}'",
            request_id,
            message.sender_address,
            message.content.chars().take(100).collect::<String>()
        );

        let command = classify_and_extract(
            message,
            self.timezone,
            &self.chat_base_url,
            self.directory.as_ref(),
        );
        debug!("[{request_id}] 🎯 Classified: {command:?}");

        let reply = match command {
            Command::Create(request) => self.reply_create(request_id, request).await,
            Command::Remove { reminder_id } => self.reply_remove(request_id, reminder_id).await,
            Command::List => self.reply_list(request_id, &message.sender_address).await,
            Command::Repeat {
                reminder_id,
                every,
                amount_token,
                unit_token,
            } => {
                self.reply_repeat(request_id, reminder_id, every, amount_token, &unit_token)
                    .await
            }
            Command::Attach {
                reminder_id,
                usernames,
            } => self.reply_attach(request_id, reminder_id, &usernames).await,
            Command::Help => response::USAGE.to_string(),
            Command::Unrecognized => response::invalid_reply().to_string(),
        };

        info!(
            "[{}] ✅ Replying | '{}'",
            request_id,
            reply.lines().next().unwrap_or("")
        );
        reply
    }

    /// Persist a new reminder and arm its one-shot timer. The stored owner
    /// list is the resolved recipients with the requester appended last.
    pub async fn create(&self, request: &CreateRequest) -> Result<Reminder, OpError> {
        let mut addresses = request.recipients.clone();
        addresses.push(request.requester_address.clone());
        let owner_address = addresses.join(",");

        let job_key = Uuid::new_v4();
        let id = self
            .database
            .insert_reminder(
                &owner_address,
                &request.title,
                request.created_at,
                request.deadline,
                job_key,
            )
            .await?;
        let reminder = self.database.get_reminder(id).await?.ok_or_else(|| {
            OpError::Storage(anyhow::anyhow!("reminder {id} missing right after insert"))
        })?;
        self.scheduler.arm(&reminder);
        info!(
            "Created reminder {id} for {owner_address}, due {}",
            request.deadline
        );
        Ok(reminder)
    }

    /// Cancel any live timer for the reminder and delete its record.
    pub async fn cancel(&self, reminder_id: i64) -> Result<(), OpError> {
        let reminder = self
            .database
            .get_reminder(reminder_id)
            .await?
            .ok_or(OpError::NotFound(reminder_id))?;
        // cancelling an already-fired job is a no-op, the row still goes
        self.scheduler.cancel(reminder.job_key);
        if !self.database.delete_reminder(reminder_id).await? {
            return Err(OpError::NotFound(reminder_id));
        }
        Ok(())
    }

    /// Turn the reminder's timer into a recurring cadence. The stored
    /// record is untouched; cadences live only in the engine.
    pub async fn rearm_recurring(
        &self,
        reminder_id: i64,
        every: RepeatEvery,
    ) -> Result<(), OpError> {
        let reminder = self
            .database
            .get_reminder(reminder_id)
            .await?
            .ok_or(OpError::NotFound(reminder_id))?;
        self.scheduler.rearm_recurring(&reminder, every);
        Ok(())
    }

    /// Union newly resolved addresses into the reminder's delivery set.
    /// Existing addresses keep their order; new ones append in first-seen
    /// order; nothing is ever duplicated. The timer is not touched.
    pub async fn attach_recipients(
        &self,
        reminder_id: i64,
        usernames: &[String],
    ) -> Result<Reminder, OpError> {
        let reminder = self
            .database
            .get_reminder(reminder_id)
            .await?
            .ok_or(OpError::NotFound(reminder_id))?;

        let resolution = recipients::resolve(self.directory.as_ref(), usernames);
        if resolution.is_partial() {
            warn!(
                "unresolved recipients on reminder {reminder_id}: {:?}",
                resolution.unresolved
            );
        }

        let mut merged: Vec<String> = reminder.addresses().map(|a| a.to_string()).collect();
        for address in resolution.resolved {
            if !merged.contains(&address) {
                merged.push(address);
            }
        }
        let joined = merged.join(",");
        if !self.database.update_owner_address(reminder_id, &joined).await? {
            return Err(OpError::NotFound(reminder_id));
        }
        self.database
            .get_reminder(reminder_id)
            .await?
            .ok_or(OpError::NotFound(reminder_id))
    }

    /// Every reminder whose delivery set contains the address.
    pub async fn list_for(&self, address: &str) -> Result<Vec<Reminder>, OpError> {
        Ok(self.database.list_reminders_for(address).await?)
    }

    async fn reply_create(&self, request_id: Uuid, request: CreateRequest) -> String {
        let via = request.via;
        match self.create(&request).await {
            Ok(reminder) => match via {
                CreatedVia::CalendarDate => {
                    response::stored_date_reply(reminder.id, &reminder.title)
                }
                CreatedVia::ClockTime => {
                    response::stored_clock_reply(reminder.id, &reminder.title)
                }
                CreatedVia::Shorthand => {
                    response::stored_link_reply(reminder.id, &reminder.title)
                }
                CreatedVia::Add => response::stored_add_reply(reminder.id),
            },
            Err(e) => {
                error!("[{request_id}] ❌ Create failed: {e}");
                response::error_reply().to_string()
            }
        }
    }

    async fn reply_remove(&self, request_id: Uuid, reminder_id: i64) -> String {
        match self.cancel(reminder_id).await {
            Ok(()) => response::deleted_reply().to_string(),
            Err(OpError::NotFound(_)) => response::not_deleted_reply().to_string(),
            Err(e) => {
                error!("[{request_id}] ❌ Remove failed: {e}");
                response::not_deleted_reply().to_string()
            }
        }
    }

    async fn reply_list(&self, request_id: Uuid, address: &str) -> String {
        match self.list_for(address).await {
            Ok(reminders) => {
                let rows: Vec<(i64, String, String)> = reminders
                    .iter()
                    .map(|reminder| {
                        (
                            reminder.id,
                            reminder.title.clone(),
                            reminder
                                .deadline
                                .with_timezone(&self.timezone)
                                .format("%Y-%m-%d %H:%M")
                                .to_string(),
                        )
                    })
                    .collect();
                response::reminders_list_reply(&rows)
            }
            Err(e) => {
                error!("[{request_id}] ❌ List failed: {e}");
                response::error_reply().to_string()
            }
        }
    }

    async fn reply_repeat(
        &self,
        request_id: Uuid,
        reminder_id: i64,
        every: RepeatEvery,
        amount_token: i64,
        unit_token: &str,
    ) -> String {
        match self.rearm_recurring(reminder_id, every).await {
            Ok(()) => response::repeat_reply(amount_token, unit_token),
            Err(OpError::NotFound(_)) => {
                warn!("[{request_id}] ⚠️ Repeat on unknown reminder {reminder_id}");
                response::error_reply().to_string()
            }
            Err(e) => {
                error!("[{request_id}] ❌ Repeat failed: {e}");
                response::error_reply().to_string()
            }
        }
    }

    async fn reply_attach(
        &self,
        request_id: Uuid,
        reminder_id: i64,
        usernames: &[String],
    ) -> String {
        match self.attach_recipients(reminder_id, usernames).await {
            Ok(reminder) => response::attach_reply(usernames, reminder.id),
            Err(OpError::NotFound(_)) => {
                warn!("[{request_id}] ⚠️ Attach on unknown reminder {reminder_id}");
                response::error_reply().to_string()
            }
            Err(e) => {
                error!("[{request_id}] ❌ Attach failed: {e}");
                response::error_reply().to_string()
            }
        }
    }
}
