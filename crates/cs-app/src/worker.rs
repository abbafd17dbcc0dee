//! The single background worker draining the job store.

use std::sync::Arc;
use std::time::Duration;
use chrono::Local;
use cs_core::{filter_comments, render_report, CommentSource};
use tokio::sync::watch;
use tracing::{error, info, warn};
use crate::config::WorkerConfig;
use crate::error::JobError;
use crate::job::{Job, JobResult};
use crate::mail::Mailer;
use crate::store::JobStore;

pub struct Worker {
    store: Arc<JobStore>,
    source: Arc<dyn CommentSource>,
    mailer: Arc<dyn Mailer>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        store: Arc<JobStore>,
        source: Arc<dyn CommentSource>,
        mailer: Arc<dyn Mailer>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            source,
            mailer,
            config,
        }
    }

    /// Poll the store until `shutdown` flips to true or its sender goes away.
    /// A job that has been dequeued always runs to a terminal state first.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let pause = match self.store.next_pending().await {
                Ok(Some(job)) => {
                    self.process(job).await;
                    continue;
                }
                Ok(None) => self.config.poll_interval,
                Err(e) => {
                    error!("Error in worker loop: {}", e);
                    self.config.error_backoff
                }
            };

            if !sleep_or_shutdown(pause, &mut shutdown).await {
                break;
            }
        }

        info!("Worker stopped");
    }

    async fn process(&self, job: Job) {
        let id = job.id.clone();
        info!(job_id = %id, "Processing request");

        match self.try_process(job).await {
            Ok(result) => info!(
                job_id = %id,
                comment_count = result.comment_count,
                email_sent = result.email_sent,
                "Request completed"
            ),
            Err(e) => {
                error!(job_id = %id, "Error processing request: {}", e);
                if let Err(e) = self.store.mark_failed(&id, e.to_string()).await {
                    error!(job_id = %id, "Error recording failure: {}", e);
                }
            }
        }
    }

    async fn try_process(&self, job: Job) -> Result<JobResult, JobError> {
        self.store.mark_processing(&job.id).await?;

        let id = job.id.clone();
        let source = Arc::clone(&self.source);
        let mailer = Arc::clone(&self.mailer);
        let result = tokio::spawn(execute(job, source, mailer)).await?;

        self.store.mark_completed(&id, result).await?;
        Ok(result)
    }
}

/// Fetch, filter, render and send. Delivery failure is reported, not raised.
async fn execute(job: Job, source: Arc<dyn CommentSource>, mailer: Arc<dyn Mailer>) -> JobResult {
    let comments = filter_comments(source.as_ref(), &job.video_url, &job.phrases).await;
    let report = render_report(&job.video_url, &job.phrases, &comments, Local::now());

    let email_sent = match mailer.send(&job.email, &report).await {
        Ok(()) => {
            info!(job_id = %job.id, to = %job.email, "Email sent");
            true
        }
        Err(e) => {
            warn!(job_id = %job.id, to = %job.email, "Error sending email: {}", e);
            false
        }
    };

    JobResult {
        comment_count: comments.len(),
        email_sent,
    }
}

/// Returns false when the worker should stop.
async fn sleep_or_shutdown(pause: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let changed = tokio::select! {
        _ = tokio::time::sleep(pause) => return true,
        changed = shutdown.changed() => changed,
    };
    changed.is_ok() && !*shutdown.borrow()
}
