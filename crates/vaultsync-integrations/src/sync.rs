//! Sync queue: deduplicating trigger plus a background worker that drives
//! the external executor.

use crate::errors::{Error, Result};
use crate::retry::{calculate_retry_delay, should_abandon_sync};
use crate::store::IntegrationStore;
use crate::traits::{SyncExecutor, SyncTrigger};
use crate::types::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vaultsync_storage::{Storage, TransactionExt, CF_SYNC_JOBS, CF_SYNC_JOBS_BY_SCOPE};

/// Sync queue knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncQueueConfig {
    /// Bounded channel size; triggers wait when the worker falls behind
    pub capacity: usize,
    pub max_attempts: u32,
    pub base_delay_seconds: u64,
}

impl Default for SyncQueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            max_attempts: 5,
            base_delay_seconds: 30,
        }
    }
}

fn scope_key(scope: &SyncScope) -> (Uuid, String, String) {
    (
        scope.project_id,
        scope.environment.clone(),
        scope.secret_path.clone(),
    )
}

/// Deliver `job_id` to the worker after `delay_seconds`, unless the queue
/// has shut down by then
fn send_later(sender: mpsc::WeakSender<Uuid>, job_id: Uuid, delay_seconds: u64) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(delay_seconds)).await;
        if let Some(sender) = sender.upgrade() {
            if sender.send(job_id).await.is_err() {
                debug!(job_id = %job_id, "Sync queue closed before retry");
            }
        }
    });
}

/// Persistent, deduplicating [`SyncTrigger`]
///
/// While a job for a scope is still `Queued`, further triggers for that scope
/// return the existing job. Once the worker picks the job up, a new trigger
/// queues a fresh one, so changes made during a pass are never lost.
pub struct SyncQueue<S: Storage> {
    storage: Arc<S>,
    sender: mpsc::Sender<Uuid>,
}

impl<S: Storage + 'static> SyncQueue<S> {
    /// Create the queue and spawn its worker on the current runtime
    ///
    /// Jobs a previous run left unfinished in storage are handed to the new
    /// worker before the queue is returned.
    pub async fn start<X: SyncExecutor>(
        storage: Arc<S>,
        executor: Arc<X>,
        config: SyncQueueConfig,
    ) -> Result<Self> {
        let (queue, receiver) = Self::new(storage.clone(), config.capacity);

        let worker = SyncWorker {
            integrations: IntegrationStore::new(storage.clone()),
            storage,
            executor,
            config,
            retry_sender: queue.sender.downgrade(),
        };
        tokio::spawn(worker.run(receiver));

        queue.resume_unfinished().await?;
        Ok(queue)
    }

    pub(crate) fn new(storage: Arc<S>, capacity: usize) -> (Self, mpsc::Receiver<Uuid>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { storage, sender }, receiver)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<SyncJob>> {
        Ok(self.storage.get(CF_SYNC_JOBS, &job_id).await?)
    }

    /// Re-deliver every non-terminal job found in storage
    ///
    /// `Queued` and `Running` jobs go out immediately (a `Running` job was cut
    /// off mid-pass); `Retrying` jobs keep their remaining backoff.
    async fn resume_unfinished(&self) -> Result<()> {
        let jobs: Vec<(Vec<u8>, SyncJob)> = self.storage.get_by_prefix(CF_SYNC_JOBS, &()).await?;
        let now = current_timestamp();
        let mut resumed = 0usize;

        for (_, job) in jobs {
            if job.status.is_terminal() {
                continue;
            }
            let delay = match job.status {
                SyncJobStatus::Retrying => job.next_attempt_at.unwrap_or(now).saturating_sub(now),
                _ => 0,
            };
            if delay == 0 {
                self.sender
                    .send(job.job_id)
                    .await
                    .map_err(|_| Error::SyncTrigger("sync worker is not running".to_string()))?;
            } else {
                send_later(self.sender.downgrade(), job.job_id, delay);
            }
            resumed += 1;
        }

        if resumed > 0 {
            info!(resumed, "Resumed unfinished sync jobs");
        }
        Ok(())
    }

    /// Mark a job no worker will receive as abandoned and free its scope slot
    async fn release_undelivered(&self, mut job: SyncJob) -> Result<()> {
        let key = scope_key(&job.scope);
        let mut tx = self.storage.begin_transaction().await?;

        if tx.get::<_, Uuid>(CF_SYNC_JOBS_BY_SCOPE, &key)? == Some(job.job_id) {
            tx.delete(CF_SYNC_JOBS_BY_SCOPE, &key)?;
        }
        job.status = SyncJobStatus::Abandoned;
        job.finished_at = Some(current_timestamp());
        job.error_message = Some("sync worker is not running".to_string());
        tx.put(CF_SYNC_JOBS, &job.job_id, &job)?;

        tx.commit().await?;
        Ok(())
    }
}

impl<S: Storage + 'static> SyncTrigger for SyncQueue<S> {
    async fn sync_integrations(&self, scope: SyncScope) -> Result<SyncTicket> {
        let key = scope_key(&scope);
        let mut tx = self.storage.begin_transaction().await?;

        if let Some(job_id) = tx.get::<_, Uuid>(CF_SYNC_JOBS_BY_SCOPE, &key)? {
            let pending = tx
                .get::<_, SyncJob>(CF_SYNC_JOBS, &job_id)?
                .is_some_and(|job| job.status == SyncJobStatus::Queued);
            if pending {
                tx.rollback();
                debug!(
                    job_id = %job_id,
                    project_id = %scope.project_id,
                    environment = %scope.environment,
                    secret_path = %scope.secret_path,
                    "Sync already queued for scope"
                );
                return Ok(SyncTicket {
                    job_id,
                    deduplicated: true,
                });
            }
        }

        let job = SyncJob {
            job_id: Uuid::new_v4(),
            scope,
            status: SyncJobStatus::Queued,
            attempt: 0,
            queued_at: current_timestamp(),
            first_attempt_at: None,
            last_attempt_at: None,
            next_attempt_at: None,
            finished_at: None,
            synced_count: 0,
            failed_count: 0,
            error_message: None,
        };
        tx.put(CF_SYNC_JOBS, &job.job_id, &job)?;
        tx.put(CF_SYNC_JOBS_BY_SCOPE, &key, &job.job_id)?;
        tx.commit().await?;

        if self.sender.send(job.job_id).await.is_err() {
            let job_id = job.job_id;
            if let Err(e) = self.release_undelivered(job).await {
                error!(job_id = %job_id, error = %e, "Failed to release undelivered sync job");
            }
            return Err(Error::SyncTrigger("sync worker is not running".to_string()));
        }

        info!(
            job_id = %job.job_id,
            project_id = %job.scope.project_id,
            environment = %job.scope.environment,
            secret_path = %job.scope.secret_path,
            "Sync job queued"
        );

        Ok(SyncTicket {
            job_id: job.job_id,
            deduplicated: false,
        })
    }
}

/// Per-integration tally of one pass
#[derive(Default)]
struct PassOutcome {
    synced: u32,
    failed: u32,
    last_error: Option<String>,
}

struct SyncWorker<S: Storage, X: SyncExecutor> {
    storage: Arc<S>,
    integrations: IntegrationStore<S>,
    executor: Arc<X>,
    config: SyncQueueConfig,
    retry_sender: mpsc::WeakSender<Uuid>,
}

impl<S: Storage + 'static, X: SyncExecutor> SyncWorker<S, X> {
    async fn run(self, mut receiver: mpsc::Receiver<Uuid>) {
        debug!("Sync worker started");

        while let Some(job_id) = receiver.recv().await {
            if let Err(e) = self.process(job_id).await {
                error!(job_id = %job_id, error = %e, "Sync pass failed");
            }
        }

        debug!("Sync worker stopped");
    }

    /// Claim a job: bump the attempt and release the scope slot
    ///
    /// The worker handles one job at a time, so a job already marked
    /// `Running` is one whose previous pass never stored its outcome.
    async fn claim(&self, job_id: Uuid) -> Result<Option<SyncJob>> {
        let mut tx = self.storage.begin_transaction().await?;

        let Some(mut job) = tx.get::<_, SyncJob>(CF_SYNC_JOBS, &job_id)? else {
            tx.rollback();
            return Ok(None);
        };
        if job.status.is_terminal() {
            tx.rollback();
            return Ok(None);
        }

        let key = scope_key(&job.scope);
        if tx.get::<_, Uuid>(CF_SYNC_JOBS_BY_SCOPE, &key)? == Some(job_id) {
            tx.delete(CF_SYNC_JOBS_BY_SCOPE, &key)?;
        }

        let now = current_timestamp();
        job.status = SyncJobStatus::Running;
        job.attempt += 1;
        job.first_attempt_at.get_or_insert(now);
        job.last_attempt_at = Some(now);
        job.next_attempt_at = None;

        tx.put(CF_SYNC_JOBS, &job_id, &job)?;
        tx.commit().await?;
        Ok(Some(job))
    }

    async fn process(&self, job_id: Uuid) -> Result<()> {
        let mut job = match self.claim(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => return Ok(()),
            Err(e) => {
                self.schedule_retry(job_id, self.config.base_delay_seconds);
                return Err(e);
            }
        };

        let pass = match self.sync_scope(&job).await {
            Ok(pass) => pass,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Sync pass interrupted");
                PassOutcome {
                    failed: 1,
                    last_error: Some(e.to_string()),
                    ..PassOutcome::default()
                }
            }
        };

        let now = current_timestamp();
        let failed = pass.failed;
        job.synced_count = pass.synced;
        job.failed_count = pass.failed;
        job.error_message = pass.last_error;

        let mut retry_in = None;
        if failed == 0 {
            job.status = SyncJobStatus::Succeeded;
            job.finished_at = Some(now);
            info!(job_id = %job_id, synced = job.synced_count, "Sync job succeeded");
        } else if should_abandon_sync(
            job.attempt,
            self.config.max_attempts,
            job.first_attempt_at.unwrap_or(now),
            now,
        ) {
            job.status = SyncJobStatus::Abandoned;
            job.finished_at = Some(now);
            warn!(
                job_id = %job_id,
                attempt = job.attempt,
                failed,
                "Sync job abandoned"
            );
        } else {
            let delay = calculate_retry_delay(job.attempt, self.config.base_delay_seconds);
            job.status = SyncJobStatus::Retrying;
            job.next_attempt_at = Some(now.saturating_add(delay));
            retry_in = Some(delay);
            warn!(
                job_id = %job_id,
                attempt = job.attempt,
                failed,
                retry_in_seconds = delay,
                "Sync job will be retried"
            );
        }

        let stored = self.storage.put(CF_SYNC_JOBS, &job_id, &job).await;
        match (stored, retry_in) {
            (Ok(()), Some(delay)) => self.schedule_retry(job_id, delay),
            (Ok(()), None) => {}
            (Err(e), retry_in) => {
                // Still `Running` in storage; redelivery lets claim take it again
                let delay = retry_in.unwrap_or_else(|| {
                    calculate_retry_delay(job.attempt, self.config.base_delay_seconds)
                });
                self.schedule_retry(job_id, delay);
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Run the executor over every active integration in the job's scope
    async fn sync_scope(&self, job: &SyncJob) -> Result<PassOutcome> {
        let targets = self
            .integrations
            .find(&IntegrationFilter::by_scope(&job.scope))
            .await?;

        let mut pass = PassOutcome::default();
        for integration in targets {
            let outcome = self
                .executor
                .sync_integration(job.job_id, &integration)
                .await;
            if let Err(message) = &outcome {
                warn!(
                    job_id = %job.job_id,
                    integration_id = %integration.id,
                    error = %message,
                    "Integration sync failed"
                );
                pass.last_error = Some(message.clone());
            }

            let recorded = self
                .integrations
                .record_sync_result(integration.id, job.job_id, &outcome)
                .await?;
            match (recorded, outcome.is_ok()) {
                (false, _) => {}
                (true, true) => pass.synced += 1,
                (true, false) => pass.failed += 1,
            }
        }
        Ok(pass)
    }

    fn schedule_retry(&self, job_id: Uuid, delay_seconds: u64) {
        send_later(self.retry_sender.clone(), job_id, delay_seconds);
    }
}

/// Executor that only logs; stands in until real provider clients exist
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingExecutor;

impl SyncExecutor for LoggingExecutor {
    async fn sync_integration(
        &self,
        job_id: Uuid,
        integration: &Integration,
    ) -> std::result::Result<(), String> {
        info!(
            job_id = %job_id,
            integration_id = %integration.id,
            integration = %integration.integration,
            environment = %integration.environment.slug,
            secret_path = %integration.secret_path,
            "Syncing integration"
        );
        Ok(())
    }
}
