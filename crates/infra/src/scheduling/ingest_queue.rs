//! Ingest work queue
//!
//! One unit of work = one source/calendar sync. Workers pull units off an
//! mpsc channel with no shared state between units beyond the store itself.
//! Failed units are classified: transient errors re-queue with exponential
//! backoff (as new delayed submissions, never in-place loops holding a
//! worker); terminal errors — deleted records, revoked auth, bad
//! configuration — are recorded and dropped.

use std::sync::Arc;
use std::time::Duration;

use gather_core::IngestionCoordinator;
use gather_domain::{GatherError, ImportKind};
use rand::Rng;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Backoff cap between retries.
const MAX_BACKOFF: Duration = Duration::from_secs(32);

/// What one queued unit syncs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTarget {
    Source { id: String },
    Calendar { id: String, kind: Option<ImportKind> },
}

impl JobTarget {
    fn describe(&self) -> String {
        match self {
            Self::Source { id } => format!("source:{id}"),
            Self::Calendar { id, .. } => format!("calendar:{id}"),
        }
    }

    fn is_extract(&self) -> bool {
        matches!(self, Self::Calendar { kind: Some(ImportKind::Extract), .. })
    }
}

#[derive(Debug, Clone)]
struct IngestJob {
    target: JobTarget,
    attempt: u32,
}

/// Queue tuning knobs.
#[derive(Debug, Clone)]
pub struct IngestQueueConfig {
    /// Worker count pulling units concurrently.
    pub workers: usize,
    /// Retry cap for most adapters.
    pub max_attempts: u32,
    /// Retry cap for AI extraction runs.
    pub extract_max_attempts: u32,
    /// Timeout for a single unit.
    pub job_timeout: Duration,
    /// Base delay for retry backoff.
    pub base_backoff: Duration,
}

impl Default for IngestQueueConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_attempts: 3,
            extract_max_attempts: 2,
            job_timeout: Duration::from_secs(300),
            base_backoff: Duration::from_secs(1),
        }
    }
}

/// Cheap clonable handle for submitting work.
#[derive(Clone)]
pub struct IngestSubmitter {
    tx: mpsc::UnboundedSender<IngestJob>,
}

impl IngestSubmitter {
    /// Submit a unit for immediate execution.
    pub fn submit(&self, target: JobTarget) {
        self.send_job(IngestJob { target, attempt: 1 });
    }

    /// Submit a unit after a delay (stagger, retry backoff).
    pub fn submit_after(&self, target: JobTarget, delay: Duration) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(IngestJob { target, attempt: 1 }).is_err() {
                debug!("ingest queue closed before delayed submission");
            }
        });
    }

    fn send_job(&self, job: IngestJob) {
        if self.tx.send(job).is_err() {
            debug!("ingest queue closed, dropping submission");
        }
    }
}

/// Background task queue with a worker pool.
pub struct IngestQueue {
    coordinator: Arc<IngestionCoordinator>,
    config: IngestQueueConfig,
    tx: mpsc::UnboundedSender<IngestJob>,
    rx: Option<mpsc::UnboundedReceiver<IngestJob>>,
    cancellation: CancellationToken,
    worker_handles: Vec<JoinHandle<()>>,
}

impl IngestQueue {
    pub fn new(coordinator: Arc<IngestionCoordinator>, config: IngestQueueConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            coordinator,
            config,
            tx,
            rx: Some(rx),
            cancellation: CancellationToken::new(),
            worker_handles: Vec::new(),
        }
    }

    /// Handle for producers (the sweep scheduler, manual triggers).
    pub fn submitter(&self) -> IngestSubmitter {
        IngestSubmitter { tx: self.tx.clone() }
    }

    /// Spawn the worker pool.
    pub fn start(&mut self) -> SchedulerResult<()> {
        let rx = self.rx.take().ok_or(SchedulerError::AlreadyRunning)?;
        let rx = Arc::new(Mutex::new(rx));

        let workers = self.config.workers.max(1);
        for worker_id in 0..workers {
            let rx = Arc::clone(&rx);
            let coordinator = Arc::clone(&self.coordinator);
            let config = self.config.clone();
            let submitter = self.submitter();
            let cancel = self.cancellation.clone();

            self.worker_handles.push(tokio::spawn(async move {
                worker_loop(worker_id, rx, coordinator, config, submitter, cancel).await;
            }));
        }

        info!(workers, "ingest queue started");
        Ok(())
    }

    /// Stop the workers and wait for them to wind down.
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if self.worker_handles.is_empty() {
            return Err(SchedulerError::NotRunning);
        }
        self.cancellation.cancel();

        for handle in self.worker_handles.drain(..) {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: 5 })?
                .map_err(|e| SchedulerError::TaskJoinFailed(e.to_string()))?;
        }

        info!("ingest queue stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.worker_handles.is_empty()
    }
}

impl Drop for IngestQueue {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("IngestQueue dropped while running; cancelling workers");
            self.cancellation.cancel();
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<IngestJob>>>,
    coordinator: Arc<IngestionCoordinator>,
    config: IngestQueueConfig,
    submitter: IngestSubmitter,
    cancel: CancellationToken,
) {
    debug!(worker_id, "ingest worker started");
    loop {
        let job = tokio::select! {
            () = cancel.cancelled() => break,
            job = async { rx.lock().await.recv().await } => match job {
                Some(job) => job,
                None => break,
            },
        };

        process_job(&job, &coordinator, &config, &submitter).await;
    }
    debug!(worker_id, "ingest worker stopped");
}

async fn process_job(
    job: &IngestJob,
    coordinator: &IngestionCoordinator,
    config: &IngestQueueConfig,
    submitter: &IngestSubmitter,
) {
    let unit = job.target.describe();
    debug!(unit = %unit, attempt = job.attempt, "processing ingest unit");

    let run = async {
        match &job.target {
            JobTarget::Source { id } => coordinator.run_source(id).await,
            JobTarget::Calendar { id, .. } => coordinator.run_calendar(id).await,
        }
    };

    let outcome = match tokio::time::timeout(config.job_timeout, run).await {
        Ok(result) => result,
        Err(_) => Err(GatherError::Network(format!(
            "sync timed out after {}s",
            config.job_timeout.as_secs()
        ))),
    };

    match outcome {
        Ok(result) => {
            debug!(unit = %unit, count = result.count, "ingest unit completed");
        }
        Err(e) => handle_failure(job, &e, config, submitter),
    }
}

fn handle_failure(
    job: &IngestJob,
    err: &GatherError,
    config: &IngestQueueConfig,
    submitter: &IngestSubmitter,
) {
    let unit = job.target.describe();
    let cap = if job.target.is_extract() {
        config.extract_max_attempts
    } else {
        config.max_attempts
    };

    if is_terminal(err) {
        warn!(unit = %unit, error = %err, "terminal failure, not retrying");
        return;
    }

    if job.attempt >= cap {
        error!(unit = %unit, attempts = job.attempt, error = %err, "retries exhausted");
        return;
    }

    let delay = calculate_backoff(job.attempt, config.base_backoff);
    warn!(
        unit = %unit,
        attempt = job.attempt,
        retry_in_ms = delay.as_millis() as u64,
        error = %err,
        "transient failure, re-queueing with backoff"
    );

    // Retries are new queued units after a delay, not in-place loops
    let tx = submitter.tx.clone();
    let retry = IngestJob { target: job.target.clone(), attempt: job.attempt + 1 };
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if tx.send(retry).is_err() {
            debug!("ingest queue closed before retry submission");
        }
    });
}

/// Whether a failure should never be retried: the record is gone, the
/// credentials are revoked, or the configuration itself is bad.
#[must_use]
pub fn is_terminal(err: &GatherError) -> bool {
    matches!(
        err,
        GatherError::NotFound(_)
            | GatherError::Auth(_)
            | GatherError::Config(_)
            | GatherError::InvalidInput(_)
    )
}

/// Exponential backoff with a cap and +/-25% jitter.
#[must_use]
pub fn calculate_backoff(attempt: u32, base: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(5);
    let delay = base.saturating_mul(2u32.saturating_pow(exponent));
    let capped = delay.min(MAX_BACKOFF);

    let jitter_range = (capped.as_millis() as u64) / 4;
    if jitter_range == 0 {
        return capped;
    }
    let mut rng = rand::thread_rng();
    let jitter = rng.gen_range(0..=jitter_range * 2) as i64 - jitter_range as i64;
    let millis = (capped.as_millis() as i64 + jitter).max(0) as u64;
    Duration::from_millis(millis)
}
