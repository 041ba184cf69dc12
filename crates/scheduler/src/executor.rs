//! Delivery execution for fired jobs.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use database::models::DeliveryOutcome;
use database::{group, ledger, schedule, ClaimOutcome};
use selection::SelectionEngine;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::jobs::{JobRegistry, JobSpec, Occasion};
use crate::transport::{DeliveryPayload, Transport, TransportError};

/// Terminal result of one fired job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The transport accepted the payload.
    Delivered,
    /// The occasion was already claimed. Expected with duplicate timers or
    /// restart replays; not an error.
    DuplicateSuppressed,
    /// The group was inactive or muted at fire time.
    SkippedInactive,
    /// Selection had nothing to offer (quota, cooldown, empty catalog).
    NoContent,
    /// The send failed, or the job was abandoned. The occasion stays
    /// consumed either way.
    Failed,
}

/// Runs fired jobs: claim, build payload, send, record.
pub struct Executor {
    pool: SqlitePool,
    selection: SelectionEngine,
    transport: Arc<dyn Transport>,
    registry: Arc<JobRegistry>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl Executor {
    /// Create an executor with the given collaborators.
    pub fn new(
        pool: SqlitePool,
        selection: SelectionEngine,
        transport: Arc<dyn Transport>,
        registry: Arc<JobRegistry>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self { pool, selection, transport, registry, clock, config }
    }

    /// Execute one fired job, bounded by the configured job timeout.
    ///
    /// Gateway and transport failures become recorded outcomes here and
    /// never propagate; only store errors do.
    pub async fn execute(&self, job: &JobSpec) -> Result<ExecutionOutcome> {
        match tokio::time::timeout(self.config.job_timeout, self.run(job)).await {
            Ok(result) => result,
            Err(_) => {
                let key = job.occasion.occasion_key(job.local_date);
                error!(
                    "Job {} for group {} exceeded {}s, abandoning",
                    key,
                    job.group_id,
                    self.config.job_timeout.as_secs()
                );

                // Close out the claim row if the job got that far.
                let closed = ledger::record_outcome(
                    &self.pool,
                    &job.group_id,
                    job.occasion.kind(),
                    &key,
                    DeliveryOutcome::Failed,
                    None,
                    self.clock.now_utc(),
                )
                .await;
                if let Err(e) = closed {
                    debug!("No claim to close for abandoned job {}: {}", key, e);
                }

                Ok(ExecutionOutcome::Failed)
            }
        }
    }

    async fn run(&self, job: &JobSpec) -> Result<ExecutionOutcome> {
        let now = self.clock.now_utc();
        let key = job.occasion.occasion_key(job.local_date);

        // Settings may have changed while the timer slept.
        let group = group::get_group(&self.pool, &job.group_id).await?;
        if !group.active || !group.notifications_enabled {
            info!("Group {} is inactive or muted, skipping {}", job.group_id, key);
            return Ok(ExecutionOutcome::SkippedInactive);
        }

        // Claim before any externally visible side effect.
        let claim = ledger::try_claim(
            &self.pool,
            &job.group_id,
            job.occasion.kind(),
            &key,
            job.local_date,
            now,
        )
        .await?;
        if claim == ClaimOutcome::AlreadyClaimed {
            info!(
                "Occasion {} for group {} already handled, suppressing duplicate",
                key, job.group_id
            );
            return Ok(ExecutionOutcome::DuplicateSuppressed);
        }

        let (payload, category_id) = match job.occasion {
            Occasion::Alert(prayer) => {
                let Some(stored) =
                    schedule::get_schedule(&self.pool, &job.group_id, job.local_date).await?
                else {
                    error!(
                        "No stored schedule behind armed job {} for group {}",
                        key, job.group_id
                    );
                    self.record(job, DeliveryOutcome::Failed, None).await?;
                    return Ok(ExecutionOutcome::Failed);
                };
                let payload = DeliveryPayload::PrayerAlert {
                    prayer,
                    time: prayer.time_in(&stored),
                    hijri_date: stored.hijri_date,
                };
                (payload, None)
            }
            Occasion::Content(window) => {
                match self.selection.select_for_window(&group, window, now).await? {
                    Some(entry) => {
                        let category_id = entry.category_id.clone();
                        let payload = DeliveryPayload::Content {
                            body: entry.body,
                            attribution: entry.attribution,
                            grade: entry.grade,
                            source_url: entry.source_url,
                        };
                        (payload, Some(category_id))
                    }
                    None => {
                        info!("No content available for group {} ({})", job.group_id, key);
                        self.record(job, DeliveryOutcome::Skipped, None).await?;
                        return Ok(ExecutionOutcome::NoContent);
                    }
                }
            }
        };

        match self.send_with_retry(&group.id, &payload).await {
            Ok(()) => {
                self.record(job, DeliveryOutcome::Delivered, category_id.as_deref())
                    .await?;
                info!("Delivered {} to group {}", key, job.group_id);
                Ok(ExecutionOutcome::Delivered)
            }
            Err(TransportError::Permanent(reason)) => {
                warn!(
                    "Group {} unreachable ({}), deactivating and cancelling its timers",
                    job.group_id, reason
                );
                self.record(job, DeliveryOutcome::Failed, category_id.as_deref())
                    .await?;
                group::set_active(&self.pool, &job.group_id, false).await?;

                // Last: aborting the group's timers also aborts this task at
                // its next await point.
                let cancelled = self.registry.cancel_group(&job.group_id).await;
                info!("Cancelled {} timers for group {}", cancelled, job.group_id);
                Ok(ExecutionOutcome::Failed)
            }
            Err(TransportError::Transient(reason)) => {
                warn!(
                    "Delivery of {} to group {} gave up after retries: {}",
                    key, job.group_id, reason
                );
                self.record(job, DeliveryOutcome::Failed, category_id.as_deref())
                    .await?;
                Ok(ExecutionOutcome::Failed)
            }
        }
    }

    /// Deliver with bounded retry on transient transport failures.
    async fn send_with_retry(
        &self,
        recipient: &str,
        payload: &DeliveryPayload,
    ) -> std::result::Result<(), TransportError> {
        let policy = &self.config.send_retry;
        let mut attempt = 0;

        loop {
            match self.transport.deliver(recipient, payload).await {
                Ok(()) => return Ok(()),
                Err(TransportError::Transient(reason)) if attempt + 1 < policy.max_attempts => {
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        "Send to {} failed (attempt {}/{}), retrying in {:?}: {}",
                        recipient,
                        attempt + 1,
                        policy.max_attempts,
                        delay,
                        reason
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn record(
        &self,
        job: &JobSpec,
        outcome: DeliveryOutcome,
        category_id: Option<&str>,
    ) -> Result<()> {
        ledger::record_outcome(
            &self.pool,
            &job.group_id,
            job.occasion.kind(),
            &job.occasion.occasion_key(job.local_date),
            outcome,
            category_id,
            self.clock.now_utc(),
        )
        .await?;
        Ok(())
    }
}
