//! # Feature: Scheduling Engine
//!
//! Live timer table for reminders. Every armed reminder owns one spawned
//! task that sleeps until the deadline and then hands the record to the
//! delivery transport. Jobs are keyed by the record's `job_key`; the table
//! entry and the task are created together and torn down together.
//!
//! Fire and cancel race on the same key, so the one-shot fire path claims
//! its job by removing its own entry before delivering. If the entry is
//! already gone (cancelled or replaced), the task stands down without
//! delivering. Each registration carries a token so a stale task can never
//! claim a job that replaced it under the same key.
//!
//! - **Version**: 3.2.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.2.0: Registration tokens close the stale-claim window on rearm
//! - 3.0.0: Recurring cadences replace live one-shots in place
//! - 2.0.0: Jobs keyed by stored job key, restore on startup
//! - 1.0.0: Initial one-shot timers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::database::Database;
use crate::features::delivery::DeliveryTransport;

use super::{Reminder, RepeatEvery};

/// Upper bound on one timer sleep. Waits are re-checked against the wall
/// clock at least this often so large clock adjustments are picked up.
const MAX_SLEEP_CHUNK: StdDuration = StdDuration::from_secs(60);

/// What kind of timer is live under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    OneShot,
    Recurring,
}

struct ArmedJob {
    reminder_id: i64,
    kind: JobKind,
    /// Identifies this registration; a task only acts on the table entry
    /// that still carries its own token.
    token: u64,
    handle: JoinHandle<()>,
}

struct SchedulerInner {
    jobs: DashMap<Uuid, ArmedJob>,
    database: Database,
    transport: Arc<dyn DeliveryTransport>,
    next_token: AtomicU64,
}

/// Shared handle to the scheduling engine. Cheap to clone.
#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<SchedulerInner>,
}

impl ReminderScheduler {
    pub fn new(database: Database, transport: Arc<dyn DeliveryTransport>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                jobs: DashMap::new(),
                database,
                transport,
                next_token: AtomicU64::new(0),
            }),
        }
    }

    /// Arm a one-shot timer for the reminder's deadline.
    ///
    /// At fire time the task claims its table entry; delivery only happens
    /// when the claim succeeds, so a concurrent cancel can never produce a
    /// fire after it returned.
    pub fn arm(&self, reminder: &Reminder) {
        let key = reminder.job_key;
        let reminder_id = reminder.id;
        let deadline = reminder.deadline;
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let inner = Arc::clone(&self.inner);

        let handle = tokio::spawn(async move {
            // Hold until our table entry exists, so the claim below cannot
            // run ahead of registration.
            if registered_rx.await.is_err() {
                return;
            }
            wait_until(deadline).await;
            let claimed = inner
                .jobs
                .remove_if(&key, |_, job| job.token == token)
                .is_some();
            if !claimed {
                debug!("Timer for reminder {reminder_id} stood down (cancelled or replaced)");
                return;
            }
            debug!("Reminder {reminder_id} fired");
            deliver(&inner, reminder_id).await;
        });

        self.register(
            key,
            ArmedJob {
                reminder_id,
                kind: JobKind::OneShot,
                token,
                handle,
            },
        );
        let _ = registered_tx.send(());
        debug!("Armed reminder {reminder_id} for {deadline}");
    }

    /// Replace whatever is live under the reminder's key with a recurring
    /// timer. The first fire is at the stored deadline if still future,
    /// otherwise the cadence steps forward from the deadline until it is.
    /// There is no catch-up burst for missed intervals.
    pub fn rearm_recurring(&self, reminder: &Reminder, every: RepeatEvery) {
        let key = reminder.job_key;
        let reminder_id = reminder.id;
        let first_fire = match first_fire_after(reminder.deadline, every, Utc::now()) {
            Some(instant) => instant,
            None => {
                self.cancel(key);
                error!("Cadence for reminder {reminder_id} stepped past the calendar range");
                return;
            }
        };
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let inner = Arc::clone(&self.inner);

        let handle = tokio::spawn(async move {
            if registered_rx.await.is_err() {
                return;
            }
            let mut next_fire = first_fire;
            loop {
                wait_until(next_fire).await;
                // Fire only while our registration is still the live one.
                // The entry guard is held across the spawn so a concurrent
                // cancel cannot return before this delivery is in flight.
                match inner.jobs.get(&key) {
                    Some(job) if job.value().token == token => {
                        debug!("Recurring reminder {reminder_id} fired");
                        let delivery = Arc::clone(&inner);
                        tokio::spawn(async move {
                            deliver(&delivery, reminder_id).await;
                        });
                    }
                    _ => return,
                }
                next_fire = match every.advance(next_fire) {
                    Some(instant) => instant,
                    None => {
                        inner.jobs.remove_if(&key, |_, job| job.token == token);
                        error!("Cadence for reminder {reminder_id} stepped past the calendar range");
                        return;
                    }
                };
            }
        });

        self.register(
            key,
            ArmedJob {
                reminder_id,
                kind: JobKind::Recurring,
                token,
                handle,
            },
        );
        let _ = registered_tx.send(());
        debug!("Rearmed reminder {reminder_id} every {} {}", every.amount, every.unit.as_str());
    }

    /// Remove any live timer under the key and abort its task. Cancelling
    /// an absent or already-fired job is a successful no-op; the return
    /// value reports whether a live timer was actually removed.
    pub fn cancel(&self, job_key: Uuid) -> bool {
        match self.inner.jobs.remove(&job_key) {
            Some((_, job)) => {
                job.handle.abort();
                debug!("Cancelled timer for reminder {}", job.reminder_id);
                true
            }
            None => false,
        }
    }

    /// Re-arm one-shot timers for every persisted active reminder whose
    /// deadline is still future. Overdue records are skipped: firing them
    /// now would deliver a second time for anything that fired before the
    /// restart. Returns how many timers were armed.
    pub async fn restore(&self) -> Result<usize> {
        let reminders = self.inner.database.active_reminders().await?;
        let now = Utc::now();
        let mut armed = 0;
        for reminder in reminders {
            if reminder.deadline > now {
                self.arm(&reminder);
                armed += 1;
            } else {
                warn!(
                    "Skipping overdue reminder {} (deadline was {})",
                    reminder.id, reminder.deadline
                );
            }
        }
        Ok(armed)
    }

    /// Abort every live timer. Used on exit and between test cases.
    pub fn shutdown(&self) {
        let keys: Vec<Uuid> = self.inner.jobs.iter().map(|entry| *entry.key()).collect();
        for key in keys {
            self.cancel(key);
        }
    }

    pub fn is_armed(&self, job_key: Uuid) -> bool {
        self.inner.jobs.contains_key(&job_key)
    }

    pub fn armed_count(&self) -> usize {
        self.inner.jobs.len()
    }

    pub fn kind_of(&self, job_key: Uuid) -> Option<JobKind> {
        self.inner.jobs.get(&job_key).map(|job| job.value().kind)
    }

    /// Insert under the key, aborting anything the new job replaces.
    fn register(&self, key: Uuid, job: ArmedJob) {
        match self.inner.jobs.entry(key) {
            Entry::Occupied(mut occupied) => {
                let replaced = occupied.insert(job);
                replaced.handle.abort();
                debug!("Replaced timer for reminder {}", replaced.reminder_id);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(job);
            }
        }
    }
}

/// Sleep until `deadline`, in bounded chunks re-checked against the wall
/// clock.
async fn wait_until(deadline: DateTime<Utc>) {
    loop {
        let now = Utc::now();
        if now >= deadline {
            return;
        }
        let remaining = (deadline - now).to_std().unwrap_or(StdDuration::ZERO);
        tokio::time::sleep(remaining.min(MAX_SLEEP_CHUNK)).await;
    }
}

/// First recurring fire at or after `deadline` that is strictly later
/// than `now`. Returns None if stepping runs off the calendar.
fn first_fire_after(
    deadline: DateTime<Utc>,
    every: RepeatEvery,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let mut fire = deadline;
    while fire <= now {
        fire = every.advance(fire)?;
    }
    Some(fire)
}

/// Load the record behind a fired job and push its title to every address
/// on it. Failures are logged and swallowed; the engine never retries.
async fn deliver(inner: &SchedulerInner, reminder_id: i64) {
    let reminder = match inner.database.get_reminder(reminder_id).await {
        Ok(Some(reminder)) => reminder,
        Ok(None) => {
            warn!("Reminder {reminder_id} fired but its record is gone");
            return;
        }
        Err(e) => {
            error!("Could not load reminder {reminder_id} at fire time: {e}");
            return;
        }
    };
    if !reminder.active {
        debug!("Reminder {reminder_id} fired but is no longer active");
        return;
    }
    for address in reminder.addresses() {
        if let Err(e) = inner.transport.send(address, &reminder.title).await {
            error!("Delivery to {address} failed for reminder {reminder_id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::RepeatUnit;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingTransport {
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl RecordingTransport {
        fn deliveries(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeliveryTransport for RecordingTransport {
        async fn send(&self, address: &str, title: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((address.to_string(), title.to_string()));
            Ok(())
        }
    }

    /// Fails for one address, still records the attempt.
    struct FlakyTransport {
        reject: String,
        attempts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl DeliveryTransport for FlakyTransport {
        async fn send(&self, address: &str, _title: &str) -> Result<()> {
            self.attempts.lock().unwrap().push(address.to_string());
            if address == self.reject {
                anyhow::bail!("recipient rejected");
            }
            Ok(())
        }
    }

    async fn scheduler_with(
        transport: Arc<dyn DeliveryTransport>,
    ) -> (tempfile::TempDir, Database, ReminderScheduler) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scheduler.db");
        let database = Database::new(path.to_str().unwrap())
            .await
            .expect("open database");
        let scheduler = ReminderScheduler::new(database.clone(), transport);
        (dir, database, scheduler)
    }

    async fn stored_reminder(
        database: &Database,
        owner: &str,
        deadline: DateTime<Utc>,
    ) -> Reminder {
        let job_key = Uuid::new_v4();
        let id = database
            .insert_reminder(owner, "water the plants", Utc::now(), deadline, job_key)
            .await
            .expect("insert");
        database
            .get_reminder(id)
            .await
            .expect("get")
            .expect("present")
    }

    #[tokio::test]
    async fn test_arm_fires_and_delivers_to_every_address() {
        let transport = RecordingTransport::default();
        let (_dir, database, scheduler) = scheduler_with(Arc::new(transport.clone())).await;
        let reminder = stored_reminder(
            &database,
            "ana@example.com,bo@example.com",
            Utc::now() + Duration::milliseconds(120),
        )
        .await;

        scheduler.arm(&reminder);
        assert!(scheduler.is_armed(reminder.job_key));

        tokio::time::sleep(StdDuration::from_millis(400)).await;
        let deliveries = transport.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0], ("ana@example.com".to_string(), "water the plants".to_string()));
        assert_eq!(deliveries[1].0, "bo@example.com");
        // fired jobs leave the table
        assert_eq!(scheduler.armed_count(), 0);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_cancel_prevents_delivery_and_is_idempotent() {
        let transport = RecordingTransport::default();
        let (_dir, database, scheduler) = scheduler_with(Arc::new(transport.clone())).await;
        let reminder =
            stored_reminder(&database, "ana@example.com", Utc::now() + Duration::milliseconds(150))
                .await;

        scheduler.arm(&reminder);
        assert!(scheduler.cancel(reminder.job_key));
        assert_eq!(scheduler.armed_count(), 0);
        // second cancel is a successful no-op
        assert!(!scheduler.cancel(reminder.job_key));

        tokio::time::sleep(StdDuration::from_millis(400)).await;
        assert!(transport.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_after_fire_is_a_noop() {
        let transport = RecordingTransport::default();
        let (_dir, database, scheduler) = scheduler_with(Arc::new(transport.clone())).await;
        let reminder =
            stored_reminder(&database, "ana@example.com", Utc::now() + Duration::milliseconds(100))
                .await;

        scheduler.arm(&reminder);
        tokio::time::sleep(StdDuration::from_millis(350)).await;
        assert_eq!(transport.deliveries().len(), 1);

        assert!(!scheduler.cancel(reminder.job_key));
        tokio::time::sleep(StdDuration::from_millis(150)).await;
        // still exactly one delivery
        assert_eq!(transport.deliveries().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_racing_the_fire_delivers_exactly_once_or_not_at_all() {
        let transport = RecordingTransport::default();
        let (_dir, database, scheduler) = scheduler_with(Arc::new(transport.clone())).await;

        // Cancel lands right at the deadline, over and over; whichever side
        // claims the table entry decides the outcome for that round.
        for round in 0..40 {
            let reminder = stored_reminder(
                &database,
                "ana@example.com",
                Utc::now() + Duration::milliseconds(5),
            )
            .await;
            let before = transport.deliveries().len();

            scheduler.arm(&reminder);
            tokio::time::sleep(StdDuration::from_millis(5)).await;
            let cancelled = scheduler.cancel(reminder.job_key);

            // let a fire that won the claim finish its delivery
            tokio::time::sleep(StdDuration::from_millis(40)).await;
            let delivered = transport.deliveries().len() - before;
            if cancelled {
                assert_eq!(delivered, 0, "delivery after a successful cancel (round {round})");
            } else {
                assert_eq!(delivered, 1, "claimed fire lost its delivery (round {round})");
            }
            assert!(!scheduler.is_armed(reminder.job_key));
        }
    }

    #[tokio::test]
    async fn test_rearm_replaces_one_shot_and_the_old_timer_never_fires() {
        let transport = RecordingTransport::default();
        let (_dir, database, scheduler) = scheduler_with(Arc::new(transport.clone())).await;
        let reminder =
            stored_reminder(&database, "ana@example.com", Utc::now() + Duration::milliseconds(150))
                .await;

        scheduler.arm(&reminder);
        assert_eq!(scheduler.kind_of(reminder.job_key), Some(JobKind::OneShot));

        // replace before the one-shot fires; both timers target the same
        // deadline, so a double delivery here would mean the old one fired
        scheduler.rearm_recurring(
            &reminder,
            RepeatEvery { unit: RepeatUnit::Minute, amount: 1 },
        );
        assert_eq!(scheduler.armed_count(), 1);
        assert_eq!(scheduler.kind_of(reminder.job_key), Some(JobKind::Recurring));

        tokio::time::sleep(StdDuration::from_millis(400)).await;
        // exactly one delivery: the cadence's first fire at the stored
        // deadline, never the replaced one-shot on top of it
        assert_eq!(transport.deliveries().len(), 1);
        assert_eq!(scheduler.kind_of(reminder.job_key), Some(JobKind::Recurring));
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_recurring_first_fire_keeps_the_job_armed() {
        let transport = RecordingTransport::default();
        let (_dir, database, scheduler) = scheduler_with(Arc::new(transport.clone())).await;
        let reminder =
            stored_reminder(&database, "ana@example.com", Utc::now() + Duration::milliseconds(120))
                .await;

        scheduler.rearm_recurring(
            &reminder,
            RepeatEvery { unit: RepeatUnit::Minute, amount: 1 },
        );
        tokio::time::sleep(StdDuration::from_millis(400)).await;

        assert_eq!(transport.deliveries().len(), 1);
        // unlike a one-shot, the job stays armed for the next cycle
        assert!(scheduler.is_armed(reminder.job_key));
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_restore_arms_future_and_skips_overdue() {
        let transport = RecordingTransport::default();
        let (_dir, database, scheduler) = scheduler_with(Arc::new(transport.clone())).await;
        let overdue =
            stored_reminder(&database, "ana@example.com", Utc::now() - Duration::hours(1)).await;
        let upcoming =
            stored_reminder(&database, "ana@example.com", Utc::now() + Duration::hours(1)).await;

        let armed = scheduler.restore().await.expect("restore");
        assert_eq!(armed, 1);
        assert!(scheduler.is_armed(upcoming.job_key));
        assert!(!scheduler.is_armed(overdue.job_key));

        tokio::time::sleep(StdDuration::from_millis(200)).await;
        // the overdue record was skipped, not fired
        assert!(transport.deliveries().is_empty());
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_aborts_everything() {
        let transport = RecordingTransport::default();
        let (_dir, database, scheduler) = scheduler_with(Arc::new(transport.clone())).await;
        for _ in 0..3 {
            let reminder = stored_reminder(
                &database,
                "ana@example.com",
                Utc::now() + Duration::milliseconds(150),
            )
            .await;
            scheduler.arm(&reminder);
        }
        assert_eq!(scheduler.armed_count(), 3);

        scheduler.shutdown();
        assert_eq!(scheduler.armed_count(), 0);
        tokio::time::sleep(StdDuration::from_millis(400)).await;
        assert!(transport.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_fire_with_deleted_record_delivers_nothing() {
        let transport = RecordingTransport::default();
        let (_dir, database, scheduler) = scheduler_with(Arc::new(transport.clone())).await;
        let reminder =
            stored_reminder(&database, "ana@example.com", Utc::now() + Duration::milliseconds(120))
                .await;

        scheduler.arm(&reminder);
        database.delete_reminder(reminder.id).await.expect("delete");

        tokio::time::sleep(StdDuration::from_millis(400)).await;
        assert!(transport.deliveries().is_empty());
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[tokio::test]
    async fn test_one_failing_address_does_not_block_the_rest() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let transport = FlakyTransport {
            reject: "ana@example.com".to_string(),
            attempts: Arc::clone(&attempts),
        };
        let (_dir, database, scheduler) = scheduler_with(Arc::new(transport)).await;
        let reminder = stored_reminder(
            &database,
            "ana@example.com,bo@example.com",
            Utc::now() + Duration::milliseconds(120),
        )
        .await;

        scheduler.arm(&reminder);
        tokio::time::sleep(StdDuration::from_millis(400)).await;

        let seen = attempts.lock().unwrap().clone();
        assert_eq!(seen, vec!["ana@example.com", "bo@example.com"]);
    }

    #[test]
    fn test_first_fire_steps_past_stale_deadlines_without_a_burst() {
        let deadline = Utc.with_ymd_and_hms(2024, 4, 19, 12, 0, 0).unwrap();
        let now = deadline + Duration::minutes(7);
        let every = RepeatEvery { unit: RepeatUnit::Minute, amount: 3 };

        // 12:00 -> 12:03 -> 12:06 -> 12:09; the first strictly-future step
        let fire = first_fire_after(deadline, every, now).expect("fire");
        assert_eq!(fire, deadline + Duration::minutes(9));

        // a future deadline is used as-is
        let ahead = now + Duration::minutes(1);
        assert_eq!(first_fire_after(ahead, every, now), Some(ahead));
    }
}
