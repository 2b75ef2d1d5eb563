//! Periodic sweeps
//!
//! The import sweep scans every import-enabled calendar and enabled source,
//! queues whatever is due, and staggers submissions with a randomized delay
//! so a fleet of scrapers never hits the same few external sites at the
//! same instant. The dedup sweep periodically runs the cross-source
//! duplicate pass over a bounded day window. Both are wired to cron lines
//! but remain directly invokable for external triggers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gather_core::dedup::DedupEngine;
use gather_core::ports::{CalendarRepository, SourceRepository};
use gather_domain::{Result, SchedulerConfig};
use rand::Rng;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, instrument};

use crate::scheduling::error::{SchedulerError, SchedulerResult};
use crate::scheduling::ingest_queue::{IngestSubmitter, JobTarget};

/// Day window for the periodic dedup sweep: yesterday through three months
/// out covers every bucket the importers actively write to.
const DEDUP_SWEEP_LOOKBACK_DAYS: i64 = 1;
const DEDUP_SWEEP_LOOKAHEAD_DAYS: i64 = 90;

const START_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Scans for due imports and queues them with stagger.
pub struct ImportSweep {
    sources: Arc<dyn SourceRepository>,
    calendars: Arc<dyn CalendarRepository>,
    submitter: IngestSubmitter,
    stagger_max_seconds: u64,
}

impl ImportSweep {
    pub fn new(
        sources: Arc<dyn SourceRepository>,
        calendars: Arc<dyn CalendarRepository>,
        submitter: IngestSubmitter,
        stagger_max_seconds: u64,
    ) -> Self {
        Self { sources, calendars, submitter, stagger_max_seconds }
    }

    /// One sweep pass: queue everything due. Returns the number of units
    /// submitted. Invokable directly by an external cron trigger.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<usize> {
        let now = Utc::now();
        let mut submitted = 0;

        for calendar in self.calendars.list_import_enabled().await? {
            if !calendar.needs_import_sync(now) {
                continue;
            }
            let delay = self.stagger();
            debug!(calendar = %calendar.id, delay_ms = delay.as_millis() as u64, "queueing calendar sync");
            self.submitter.submit_after(
                JobTarget::Calendar { id: calendar.id.clone(), kind: calendar.import_kind },
                delay,
            );
            submitted += 1;
        }

        for source in self.sources.list_enabled().await? {
            if !source.is_due(now) {
                continue;
            }
            let delay = self.stagger();
            debug!(source = %source.slug, delay_ms = delay.as_millis() as u64, "queueing source scrape");
            self.submitter
                .submit_after(JobTarget::Source { id: source.id.clone() }, delay);
            submitted += 1;
        }

        info!(submitted, "import sweep queued due work");
        Ok(submitted)
    }

    fn stagger(&self) -> Duration {
        if self.stagger_max_seconds == 0 {
            return Duration::ZERO;
        }
        let millis = {
            let mut rng = rand::thread_rng();
            rng.gen_range(0..=self.stagger_max_seconds * 1000)
        };
        Duration::from_millis(millis)
    }
}

/// Cron wiring for the import sweep + dedup sweep, with explicit lifecycle.
pub struct SweepScheduler {
    scheduler: Option<JobScheduler>,
    config: SchedulerConfig,
    import_sweep: Arc<ImportSweep>,
    dedup: Arc<DedupEngine>,
}

impl SweepScheduler {
    pub fn new(
        config: SchedulerConfig,
        import_sweep: Arc<ImportSweep>,
        dedup: Arc<DedupEngine>,
    ) -> Self {
        Self { scheduler: None, config, import_sweep, dedup }
    }

    /// Register both cron jobs and start the underlying scheduler.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::CreationFailed(e.to_string()))?;

        let import_sweep = Arc::clone(&self.import_sweep);
        let import_job = Job::new_async(self.config.sweep_cron.as_str(), move |_id, _lock| {
            let sweep = Arc::clone(&import_sweep);
            Box::pin(async move {
                if let Err(e) = sweep.run().await {
                    error!(error = %e, "import sweep failed");
                }
            })
        })
        .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;
        scheduler
            .add(import_job)
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        let dedup = Arc::clone(&self.dedup);
        let dedup_job = Job::new_async(self.config.dedup_sweep_cron.as_str(), move |_id, _lock| {
            let dedup = Arc::clone(&dedup);
            Box::pin(async move {
                let today = Utc::now().date_naive();
                let from = today - chrono::Duration::days(DEDUP_SWEEP_LOOKBACK_DAYS);
                let to = today + chrono::Duration::days(DEDUP_SWEEP_LOOKAHEAD_DAYS);
                match dedup.sweep(from, to).await {
                    Ok(outcome) => {
                        debug!(examined = outcome.examined, removed = outcome.removed, "dedup sweep finished");
                    }
                    Err(e) => error!(error = %e, "dedup sweep failed"),
                }
            })
        })
        .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;
        scheduler
            .add(dedup_job)
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        tokio::time::timeout(START_TIMEOUT, scheduler.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: START_TIMEOUT.as_secs() })?
            .map_err(|e| SchedulerError::StartFailed(e.to_string()))?;

        self.scheduler = Some(scheduler);
        info!(
            sweep_cron = %self.config.sweep_cron,
            dedup_cron = %self.config.dedup_sweep_cron,
            "sweep scheduler started"
        );
        Ok(())
    }

    /// Shut the scheduler down.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let mut scheduler = self.scheduler.take().ok_or(SchedulerError::NotRunning)?;

        tokio::time::timeout(STOP_TIMEOUT, scheduler.shutdown())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: STOP_TIMEOUT.as_secs() })?
            .map_err(|e| SchedulerError::StopFailed(e.to_string()))?;

        info!("sweep scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }
}
