//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use vstream_queue::{JobQueue, QueueJob};

use crate::context::ProcessingContext;
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::metrics::{record_job, set_dlq_length, set_queue_length};

/// Upper bound for the requeue backoff.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(15 * 60);

/// How a job left the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobDisposition {
    /// Finished; acknowledged.
    Completed,
    /// Failed in a way a retry cannot fix; acknowledged.
    Dropped,
    /// Requeued after a backoff.
    Retrying,
    /// Moved to the dead letter stream.
    DeadLettered,
}

impl JobDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobDisposition::Completed => "completed",
            JobDisposition::Dropped => "dropped",
            JobDisposition::Retrying => "retrying",
            JobDisposition::DeadLettered => "dead_lettered",
        }
    }

    /// Decide what to do with a job given its result and attempt count.
    pub fn decide(result: &WorkerResult<()>, retry_count: u32, max_retries: u32) -> Self {
        match result {
            Ok(()) => JobDisposition::Completed,
            Err(e) if e.is_permanent_failure() || !e.is_retryable() => JobDisposition::Dropped,
            Err(_) if retry_count >= max_retries => JobDisposition::DeadLettered,
            Err(_) => JobDisposition::Retrying,
        }
    }
}

/// Consumes transcode jobs one at a time.
pub struct JobExecutor {
    ctx: ProcessingContext,
    queue: Arc<JobQueue>,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(ctx: ProcessingContext, queue: JobQueue) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            ctx,
            queue: Arc::new(queue),
            shutdown,
            consumer_name: format!("worker-{}", Uuid::new_v4()),
        }
    }

    /// Run until [`Self::shutdown`] is called.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with ladder {:?}",
            self.consumer_name,
            self.ctx
                .config
                .ladder
                .iter()
                .map(|s| s.resolution.as_str())
                .collect::<Vec<_>>()
        );

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut claim_interval = tokio::time::interval(self.ctx.config.claim_interval);
        let min_idle_ms = self.ctx.config.claim_min_idle.as_millis() as u64;

        loop {
            tokio::select! {
                _ = shutdown_requested(&mut shutdown_rx) => {
                    info!("Shutdown signal received, stopping executor");
                    break;
                }
                _ = claim_interval.tick() => {
                    match self.queue.claim_pending(&self.consumer_name, min_idle_ms, 1).await {
                        Ok(jobs) => {
                            for (message_id, job) in jobs {
                                self.execute_with_grace(message_id, job).await;
                            }
                        }
                        Err(e) => warn!("Failed to claim pending jobs: {}", e),
                    }
                    self.report_queue_depth().await;
                }
                result = self.queue.consume(&self.consumer_name, 1000, 1) => {
                    match result {
                        Ok(jobs) => {
                            for (message_id, job) in jobs {
                                self.execute_with_grace(message_id, job).await;
                            }
                        }
                        Err(e) => {
                            error!("Error consuming jobs: {}", e);
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            }
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Run a job; after a shutdown signal give it `shutdown_timeout` to
    /// finish before dropping it. A dropped job kills its encoder and stays
    /// pending, so another worker reclaims it.
    async fn execute_with_grace(&self, message_id: String, job: QueueJob) {
        let mut shutdown_rx = self.shutdown.subscribe();
        let job_id = message_id.clone();
        let running = self.execute_job(message_id, job);
        tokio::pin!(running);

        tokio::select! {
            _ = &mut running => {}
            _ = shutdown_requested(&mut shutdown_rx) => {
                let grace = self.ctx.config.shutdown_timeout;
                info!("Waiting up to {:?} for job {} to finish", grace, job_id);
                if tokio::time::timeout(grace, &mut running).await.is_err() {
                    warn!("Job {} interrupted by shutdown; it will be redelivered", job_id);
                }
            }
        }
    }

    async fn execute_job(&self, message_id: String, job: QueueJob) {
        let logger = JobLogger::new(&message_id, job.job_type());
        let span = logger.create_span();

        async {
            let result = self.process_job(&job, &logger).await;
            let retry_count = match &result {
                Err(e) if e.is_retryable() => self
                    .queue
                    .increment_retry(&message_id)
                    .await
                    .unwrap_or(u32::MAX),
                _ => 0,
            };

            let disposition =
                JobDisposition::decide(&result, retry_count, self.queue.max_retries());
            record_job(disposition.as_str());

            match (disposition, &result) {
                (JobDisposition::Completed, _) => {
                    self.ack(&message_id, &logger).await;
                    self.clear_dedup(&job, &logger).await;
                }
                (JobDisposition::Dropped, Err(e)) => {
                    logger.log_warning(&format!("dropping job: {}", e));
                    self.ack(&message_id, &logger).await;
                    self.clear_dedup(&job, &logger).await;
                }
                (JobDisposition::DeadLettered, Err(e)) => {
                    logger.log_error(&format!(
                        "exceeded max retries ({}), moving to DLQ: {}",
                        self.queue.max_retries(),
                        e
                    ));
                    if let Err(dlq_err) = self.queue.dlq(&message_id, &job, &e.to_string()).await {
                        logger.log_error(&format!("failed to move job to DLQ: {}", dlq_err));
                    }
                    self.clear_dedup(&job, &logger).await;
                }
                (JobDisposition::Retrying, Err(e)) => {
                    let delay = retry_backoff(self.ctx.config.retry_delay, retry_count);
                    logger.log_warning(&format!(
                        "will be retried in {:?} (attempt {}/{}): {}",
                        delay,
                        retry_count,
                        self.queue.max_retries(),
                        e
                    ));
                    tokio::time::sleep(delay).await;
                    if let Err(requeue_err) = self.queue.requeue(&message_id, &job).await {
                        logger.log_error(&format!(
                            "failed to requeue job, leaving it pending: {}",
                            requeue_err
                        ));
                    }
                }
                (_, Ok(())) => {}
            }
        }
        .instrument(span)
        .await
    }

    async fn process_job(&self, job: &QueueJob, logger: &JobLogger) -> WorkerResult<()> {
        match job {
            QueueJob::TranscodeVideo(j) => {
                let orchestrator = self.ctx.orchestrator(Arc::new(logger.clone()));
                orchestrator.run(j.original_file_id).await.map(|report| {
                    debug!(
                        converted = report.converted(),
                        skipped = report.skipped(),
                        failed = report.failed(),
                        "Transcode finished"
                    );
                })
            }
        }
    }

    async fn ack(&self, message_id: &str, logger: &JobLogger) {
        if let Err(e) = self.queue.ack(message_id).await {
            logger.log_error(&format!("failed to ack message {}: {}", message_id, e));
        }
    }

    /// Forget the enqueue-side dedup key so the same original can be
    /// transcoded again later.
    async fn clear_dedup(&self, job: &QueueJob, logger: &JobLogger) {
        if let Err(e) = self.queue.clear_dedup(job).await {
            logger.log_warning(&format!("failed to clear dedup key: {}", e));
        }
    }

    async fn report_queue_depth(&self) {
        if let Ok(len) = self.queue.len().await {
            set_queue_length(len);
        }
        if let Ok(len) = self.queue.dlq_len().await {
            set_dlq_length(len);
        }
    }
}

/// Delay before the `attempt`-th retry: `base` doubled per earlier attempt,
/// capped at [`MAX_RETRY_DELAY`].
fn retry_backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
