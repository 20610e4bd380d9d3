// ABOUTME: Daily scheduler firing the batch digest run at a configured UTC wall-clock time
// ABOUTME: Plain tokio time arithmetic; the pipeline stays scheduler-agnostic
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Digest Scheduler
//!
//! Fires [`DigestService::generate_and_send_daily_digests`] once a day at a
//! configured `HH:MM` UTC time. The pipeline knows nothing about schedules;
//! this module is just an external trigger source with a shutdown channel.

use crate::digest::DigestService;
use crate::errors::{AppError, AppResult};
use chrono::{NaiveTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Fallback wait when time arithmetic degenerates (clock skew)
const FALLBACK_WAIT_SECS: u64 = 60;

/// Observable scheduler state for the health endpoint
#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskStatus {
    /// Whether the trigger task is currently running
    pub running: bool,
    /// Whether the task has been stopped
    pub destroyed: bool,
}

/// Daily trigger for scheduled batch digest runs
pub struct DigestScheduler {
    service: Arc<DigestService>,
    fire_time: NaiveTime,
    schedule: String,
    running: Arc<AtomicBool>,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl DigestScheduler {
    /// Create a scheduler from an `HH:MM` UTC schedule string
    ///
    /// # Errors
    ///
    /// Returns an error if the schedule string is not a valid `HH:MM` time.
    pub fn new(service: Arc<DigestService>, schedule: &str) -> AppResult<Self> {
        let fire_time = NaiveTime::parse_from_str(schedule, "%H:%M").map_err(|e| {
            AppError::config(format!(
                "Invalid DIGEST_SCHEDULE '{schedule}' (want HH:MM): {e}"
            ))
        })?;

        Ok(Self {
            service,
            fire_time,
            schedule: schedule.to_owned(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx: Mutex::new(None),
        })
    }

    /// The configured schedule string
    #[must_use]
    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Current task state
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        let running = self.running.load(Ordering::SeqCst);
        TaskStatus {
            running,
            destroyed: !running,
        }
    }

    /// Spawn the trigger task. Idempotent: a second start is ignored.
    pub fn start(&self) {
        let mut tx_slot = match self.shutdown_tx.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if tx_slot.is_some() {
            warn!("Digest scheduler already started");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *tx_slot = Some(shutdown_tx);
        drop(tx_slot);

        self.running.store(true, Ordering::SeqCst);

        let service = self.service.clone();
        let running = self.running.clone();
        let fire_time = self.fire_time;
        let schedule = self.schedule.clone();

        tokio::spawn(async move {
            info!(
                "Daily digest scheduled at {} UTC for channels: {}",
                schedule,
                service.watched_channels().join(", ")
            );

            loop {
                let wait = wait_until_next_fire(fire_time);
                tokio::select! {
                    () = tokio::time::sleep(wait) => {
                        info!("Scheduled daily digest generation triggered");
                        service.generate_and_send_daily_digests().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Digest scheduler received shutdown signal");
                        break;
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
        });
    }

    /// Stop the trigger task
    pub fn stop(&self) {
        let mut tx_slot = match self.shutdown_tx.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Dropping the sender ends the task on its next recv
        tx_slot.take();
        self.running.store(false, Ordering::SeqCst);
        info!("Digest scheduler stopped");
    }
}

/// Time remaining until the next occurrence of `fire_time` UTC
fn wait_until_next_fire(fire_time: NaiveTime) -> Duration {
    let now = Utc::now();
    let mut target = now.date_naive().and_time(fire_time).and_utc();
    if target <= now {
        target = target + chrono::Duration::days(1);
    }
    (target - now)
        .to_std()
        .unwrap_or(Duration::from_secs(FALLBACK_WAIT_SECS))
}
