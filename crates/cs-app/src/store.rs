//! Durable job store: the pending queue and the status table behind one lock.
//!
//! Every mutation rewrites the whole table to the queue file before the lock is
//! released, so concurrent readers never see in-memory state that differs from
//! what is on disk.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use crate::error::StoreError;
use crate::job::{Job, JobResult, JobStatus};

#[derive(Debug, Default)]
struct StoreInner {
    /// Ids of pending jobs, oldest first.
    queue: VecDeque<String>,
    jobs: BTreeMap<String, Job>,
}

impl StoreInner {
    fn transition(&mut self, id: &str, next: JobStatus) -> Result<&mut Job, StoreError> {
        let job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownJob(id.to_string()))?;

        if !job.status.can_transition_to(next) {
            return Err(StoreError::InvalidTransition {
                id: id.to_string(),
                from: job.status,
                to: next,
            });
        }

        job.status = next;
        Ok(job)
    }
}

#[derive(Debug)]
pub struct JobStore {
    path: PathBuf,
    inner: Mutex<StoreInner>,
}

impl JobStore {
    /// An empty store that persists to `path`. Nothing is read from disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Load the queue file at `path` if it exists.
    ///
    /// Every record goes into the status table; only `pending` ones are queued
    /// again, oldest submission first. Jobs recorded as `processing` stay that
    /// way and are not resumed. A corrupt file is logged and the store starts empty.
    pub async fn rehydrate(path: impl Into<PathBuf>) -> Self {
        let store = Self::new(path);
        info!("Loading queue from {}", store.path.display());

        let jobs = match load_snapshot(&store.path).await {
            Ok(jobs) => jobs,
            Err(e) => {
                error!("Error loading queue from file: {}", e);
                return store;
            }
        };

        let mut pending: Vec<&Job> = jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .collect();
        pending.sort_by(|a, b| {
            a.submission_time
                .cmp(&b.submission_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        let queue: VecDeque<String> = pending.into_iter().map(|job| job.id.clone()).collect();

        let stranded = jobs
            .values()
            .filter(|job| job.status == JobStatus::Processing)
            .count();
        if stranded > 0 {
            warn!(
                "{} job(s) were processing when the previous run stopped and will not be resumed",
                stranded
            );
        }

        let finished = jobs.values().filter(|job| job.status.is_terminal()).count();
        info!(
            "Finished loading queue. {} requests loaded ({} finished), {} re-queued",
            jobs.len(),
            finished,
            queue.len()
        );

        {
            let mut inner = store.inner.lock().await;
            inner.queue = queue;
            inner.jobs = jobs;
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a new job as `pending` at the back of the queue.
    pub async fn enqueue(&self, mut job: Job) -> Result<Job, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.jobs.contains_key(&job.id) {
            return Err(StoreError::DuplicateJob(job.id));
        }

        job.status = JobStatus::Pending;
        inner.queue.push_back(job.id.clone());
        inner.jobs.insert(job.id.clone(), job.clone());
        self.persist(&inner.jobs).await;

        debug!(job_id = %job.id, queued = inner.queue.len(), "Job enqueued");
        Ok(job)
    }

    /// Pop the oldest pending job. The returned value is a snapshot; the
    /// record itself only changes through the `mark_*` methods.
    pub async fn next_pending(&self) -> Result<Option<Job>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(id) = inner.queue.pop_front() else {
            return Ok(None);
        };
        match inner.jobs.get(&id) {
            Some(job) => Ok(Some(job.clone())),
            None => Err(StoreError::MissingRecord(id)),
        }
    }

    pub async fn mark_processing(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.transition(id, JobStatus::Processing)?;
        self.persist(&inner.jobs).await;
        Ok(())
    }

    pub async fn mark_completed(&self, id: &str, result: JobResult) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let job = inner.transition(id, JobStatus::Completed)?;
        job.completion_time = Some(Utc::now());
        job.result = Some(result);
        self.persist(&inner.jobs).await;
        Ok(())
    }

    pub async fn mark_failed(&self, id: &str, error: String) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let job = inner.transition(id, JobStatus::Failed)?;
        job.error = Some(error);
        self.persist(&inner.jobs).await;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<Job> {
        self.inner.lock().await.jobs.get(id).cloned()
    }

    pub async fn pending_count(&self) -> usize {
        self.inner.lock().await.queue.len()
    }

    #[cfg(test)]
    pub(crate) async fn push_dangling_id(&self, id: &str) {
        self.inner.lock().await.queue.push_front(id.to_string());
    }

    /// Write failures are logged and dropped; the in-memory state stays authoritative.
    async fn persist(&self, jobs: &BTreeMap<String, Job>) {
        if let Err(e) = write_snapshot(&self.path, jobs).await {
            error!("Error saving queue to file: {}", e);
        }
    }
}

async fn load_snapshot(path: &Path) -> Result<BTreeMap<String, Job>, StoreError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut jobs: BTreeMap<String, Job> = serde_json::from_str(&raw)?;
    // The key is authoritative; an embedded id that disagrees is overwritten.
    for (key, job) in jobs.iter_mut() {
        if job.id != *key {
            job.id = key.clone();
        }
    }
    Ok(jobs)
}

async fn write_snapshot(path: &Path, jobs: &BTreeMap<String, Job>) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(jobs)?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
}
