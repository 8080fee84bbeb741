//! Content unlock scheduler
//!
//! Once per day (plus once unconditionally at startup, to cover any run
//! missed while the process was down) the scheduler iterates the active
//! batches, computes each batch's current week, and issues one idempotent
//! unlock write per batch scoped to its full student roster.
//!
//! Failure handling: each batch is processed inside its own error boundary,
//! so one batch's persistence failure is recorded in the run report and the
//! remaining batches still run. Only a failure listing the batches
//! themselves ends a pass early. Errors never crash the process; the next
//! scheduled run proceeds independently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use clms_common::db::models::Batch;
use clms_common::{time, week, Result};

use crate::gateway::UnlockGateway;

/// One batch's failure within a run
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub batch_id: Uuid,
    pub batch_name: String,
    pub error: String,
}

/// Summary of one unlock pass
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Batches whose week was unlocked (or already unlocked) this pass
    pub batches_processed: usize,
    /// Active batches whose start date is still in the future
    pub batches_not_started: usize,
    /// Newly written unlock records across all batches
    pub unlocks_written: u64,
    pub failures: Vec<BatchFailure>,
}

/// Scheduler state exposed through the status API
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub enabled: bool,
    pub run_hour: u32,
    pub next_run: Option<DateTime<Utc>>,
    pub runs_completed: u64,
    pub last_run: Option<RunReport>,
    pub last_error: Option<String>,
}

/// Handle to a running scheduler loop
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop to stop and wait for it to finish.
    ///
    /// Interrupts the sleep between runs; an unlock pass already in flight
    /// completes before the task exits.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// The daily content unlock scheduler
pub struct UnlockScheduler<G: UnlockGateway> {
    gateway: G,
    run_hour: u32,
    status: RwLock<SchedulerStatus>,
    /// At-most-one-run guard: a trigger that loses the race is rejected,
    /// not queued
    run_guard: Mutex<()>,
}

impl<G: UnlockGateway + 'static> UnlockScheduler<G> {
    pub fn new(gateway: G, run_hour: u32, enabled: bool) -> Self {
        Self {
            gateway,
            run_hour,
            status: RwLock::new(SchedulerStatus {
                enabled,
                run_hour,
                next_run: None,
                runs_completed: 0,
                last_run: None,
                last_error: None,
            }),
            run_guard: Mutex::new(()),
        }
    }

    /// Snapshot of the current scheduler status
    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// Spawn the scheduler loop: one run immediately, then one at each
    /// occurrence of the configured run hour.
    pub fn start(self: &Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(self);

        let task = tokio::spawn(async move {
            info!("Unlock scheduler started (run hour {:02}:00 UTC)", scheduler.run_hour);

            // Startup run corrects for a run hour missed while down
            scheduler.run_and_log().await;

            loop {
                let now = time::now();
                let next = time::next_run_after(now, scheduler.run_hour);
                scheduler.status.write().await.next_run = Some(next);

                let wait = time::duration_until(now, next);
                debug!("Next unlock run at {} ({}s from now)", next, wait.as_secs());

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        scheduler.run_and_log().await;
                    }
                    _ = shutdown_rx.changed() => {
                        info!("Unlock scheduler stopping");
                        break;
                    }
                }
            }
        });

        SchedulerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Run a pass now unless one is already in flight.
    ///
    /// Returns `None` when a concurrent run holds the guard. The pass
    /// itself only fails when the batch list cannot be fetched; per-batch
    /// failures are reported inside the `RunReport`.
    pub async fn try_run(&self) -> Option<Result<RunReport>> {
        let guard = self.run_guard.try_lock();
        let _guard = match guard {
            Ok(g) => g,
            Err(_) => {
                debug!("Unlock run already in progress, trigger ignored");
                return None;
            }
        };

        Some(self.execute_pass().await)
    }

    /// Trigger a pass from the scheduler loop, logging instead of
    /// propagating: scheduled-run failures must never take the task down.
    async fn run_and_log(&self) {
        match self.try_run().await {
            None => debug!("Scheduled trigger skipped, run already in progress"),
            Some(Err(e)) => error!("Unlock run failed: {}", e),
            Some(Ok(report)) => {
                if !report.failures.is_empty() {
                    error!(
                        "Unlock run completed with {} failed batch(es)",
                        report.failures.len()
                    );
                }
            }
        }
    }

    /// One full unlock pass over the active batches
    async fn execute_pass(&self) -> Result<RunReport> {
        let started_at = time::now();
        info!("Starting content unlock run");

        let batches = match self.gateway.active_batches().await {
            Ok(batches) => batches,
            Err(e) => {
                error!("Failed to fetch active batches: {}", e);
                self.status.write().await.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let mut report = RunReport {
            started_at,
            finished_at: started_at,
            batches_processed: 0,
            batches_not_started: 0,
            unlocks_written: 0,
            failures: Vec::new(),
        };

        for batch in &batches {
            match week::current_week(batch.start_date, time::now()) {
                None => {
                    debug!(
                        "Batch {} starts {} and has not begun, skipping",
                        batch.name, batch.start_date
                    );
                    report.batches_not_started += 1;
                }
                Some(current_week) => match self.process_batch(batch, current_week).await {
                    Ok(written) => {
                        report.batches_processed += 1;
                        report.unlocks_written += written;
                    }
                    Err(e) => {
                        // Per-batch boundary: record and continue with the rest
                        error!("Unlock failed for batch {} ({}): {}", batch.name, batch.guid, e);
                        report.failures.push(BatchFailure {
                            batch_id: batch.guid,
                            batch_name: batch.name.clone(),
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        report.finished_at = time::now();
        info!(
            batches = report.batches_processed,
            not_started = report.batches_not_started,
            unlocks = report.unlocks_written,
            failures = report.failures.len(),
            "Content unlock run complete"
        );

        let mut status = self.status.write().await;
        status.runs_completed += 1;
        status.last_error = None;
        status.last_run = Some(report.clone());

        Ok(report)
    }

    /// Unlock the current week for one batch's full roster
    async fn process_batch(&self, batch: &Batch, current_week: u32) -> Result<u64> {
        let roster = self.gateway.batch_roster(batch.guid).await?;
        let written = self
            .gateway
            .mark_week_unlocked(batch.guid, current_week, &roster)
            .await?;

        if written > 0 {
            info!(
                "Unlocked week {} for batch {} ({} new records, {} students)",
                current_week,
                batch.name,
                written,
                roster.len()
            );
        } else {
            debug!(
                "Week {} of batch {} already unlocked for all {} students",
                current_week,
                batch.name,
                roster.len()
            );
        }

        Ok(written)
    }
}
