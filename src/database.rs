//! # Feature: Reminder Store
//!
//! SQLite-backed persistence for reminders. A single connection is opened
//! with the full mutex so it can be shared across tasks; callers go through
//! the async lock, so statement work never interleaves.
//!
//! Timestamps are stored as whole epoch seconds. The scheduler key is
//! stored as its hyphenated text form.
//!
//! - **Version**: 2.3.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.3.0: Reminders carry a scheduler job key
//! - 2.0.0: Async API behind a shared connection
//! - 1.0.0: Initial reminders table

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info};
use sqlite::{Connection, ConnectionWithFullMutex, State};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::features::reminders::Reminder;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS reminders (
    reminder_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_address TEXT NOT NULL,
    title         TEXT NOT NULL,
    created_at    INTEGER NOT NULL,
    deadline      INTEGER NOT NULL,
    active        INTEGER NOT NULL DEFAULT 1,
    job_key       TEXT NOT NULL
);
";

/// Shared handle to the reminder store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<ConnectionWithFullMutex>>,
}

impl Database {
    /// Open (or create) the database at `path` and apply the schema.
    pub async fn new(path: &str) -> Result<Self> {
        let connection = Connection::open_with_full_mutex(path)?;
        connection.execute(SCHEMA_SQL)?;
        info!("Reminder store ready at {path}");
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Insert a new reminder and return its assigned id.
    pub async fn insert_reminder(
        &self,
        owner_address: &str,
        title: &str,
        created_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
        job_key: Uuid,
    ) -> Result<i64> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO reminders (owner_address, title, created_at, deadline, active, job_key)
             VALUES (?, ?, ?, ?, 1, ?)",
        )?;
        statement.bind((1, owner_address))?;
        statement.bind((2, title))?;
        statement.bind((3, created_at.timestamp()))?;
        statement.bind((4, deadline.timestamp()))?;
        statement.bind((5, job_key.to_string().as_str()))?;
        while statement.next()? != State::Done {}

        let mut row_id = connection.prepare("SELECT last_insert_rowid() AS id")?;
        if row_id.next()? != State::Row {
            anyhow::bail!("no rowid after insert");
        }
        let reminder_id = row_id.read::<i64, _>("id")?;
        debug!("Stored reminder {reminder_id} for {owner_address}");
        Ok(reminder_id)
    }

    /// Fetch one reminder by id.
    pub async fn get_reminder(&self, reminder_id: i64) -> Result<Option<Reminder>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT reminder_id, owner_address, title, created_at, deadline, active, job_key
             FROM reminders WHERE reminder_id = ?",
        )?;
        statement.bind((1, reminder_id))?;
        if statement.next()? == State::Row {
            Ok(Some(read_reminder(&statement)?))
        } else {
            Ok(None)
        }
    }

    /// Every reminder whose owner list contains `address`, oldest first.
    ///
    /// The owner column holds a comma-joined address list, so this is a
    /// substring match over the whole column.
    pub async fn list_reminders_for(&self, address: &str) -> Result<Vec<Reminder>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT reminder_id, owner_address, title, created_at, deadline, active, job_key
             FROM reminders WHERE owner_address LIKE '%' || ? || '%'
             ORDER BY reminder_id",
        )?;
        statement.bind((1, address))?;
        let mut reminders = Vec::new();
        while statement.next()? == State::Row {
            reminders.push(read_reminder(&statement)?);
        }
        Ok(reminders)
    }

    /// All reminders still marked active, oldest first. Used to re-arm
    /// timers after a restart.
    pub async fn active_reminders(&self) -> Result<Vec<Reminder>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT reminder_id, owner_address, title, created_at, deadline, active, job_key
             FROM reminders WHERE active = 1 ORDER BY reminder_id",
        )?;
        let mut reminders = Vec::new();
        while statement.next()? == State::Row {
            reminders.push(read_reminder(&statement)?);
        }
        Ok(reminders)
    }

    /// Replace the owner list of a reminder. Returns false when no such
    /// reminder exists.
    pub async fn update_owner_address(&self, reminder_id: i64, owner_address: &str) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement = connection
            .prepare("UPDATE reminders SET owner_address = ? WHERE reminder_id = ?")?;
        statement.bind((1, owner_address))?;
        statement.bind((2, reminder_id))?;
        while statement.next()? != State::Done {}
        Ok(connection.change_count() > 0)
    }

    /// Delete a reminder outright. Returns false when no such reminder
    /// exists.
    pub async fn delete_reminder(&self, reminder_id: i64) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement =
            connection.prepare("DELETE FROM reminders WHERE reminder_id = ?")?;
        statement.bind((1, reminder_id))?;
        while statement.next()? != State::Done {}
        let deleted = connection.change_count() > 0;
        if deleted {
            debug!("Deleted reminder {reminder_id}");
        }
        Ok(deleted)
    }
}

fn read_reminder(statement: &sqlite::Statement<'_>) -> Result<Reminder> {
    let created_secs = statement.read::<i64, _>("created_at")?;
    let deadline_secs = statement.read::<i64, _>("deadline")?;
    let job_key_text = statement.read::<String, _>("job_key")?;
    Ok(Reminder {
        id: statement.read::<i64, _>("reminder_id")?,
        owner_address: statement.read::<String, _>("owner_address")?,
        title: statement.read::<String, _>("title")?,
        created_at: epoch_to_utc(created_secs)?,
        deadline: epoch_to_utc(deadline_secs)?,
        active: statement.read::<i64, _>("active")? != 0,
        job_key: Uuid::parse_str(&job_key_text)?,
    })
}

fn epoch_to_utc(seconds: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {seconds}"))
}
