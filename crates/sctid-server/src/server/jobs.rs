//! Background bulk jobs.
//!
//! Bulk endpoints do not hold the HTTP request open while thousands of
//! identifiers are processed. Instead they submit the work to the
//! [`JobRegistry`], which runs it on the blocking thread pool once a
//! concurrency permit is free, and hand back a job id the client polls.
//!
//! Every job observes two cancellation sources between identifiers: the
//! registry's shutdown token and a per-job deadline. The allocator then
//! either keeps what it finished (best-effort operations) or rolls the job
//! back (all-or-nothing registration).
//!
//! Finished and failed jobs stay queryable for the registry's retention
//! period and are then dropped together with their records.

use crate::server::{
    error::{ApiError, Result},
    telemetry::increment_job_failures,
};
use core::time::Duration;
use parking_lot::RwLock;
use portable_atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use sctid::{BulkOutcome, Cancellation, IdentifierRecord, Operation};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc, time::Instant};
use tokio::{
    sync::Semaphore,
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Finished,
    Error,
}

/// The cancellation signal handed to job work.
#[derive(Clone, Debug)]
pub struct JobCancel {
    token: CancellationToken,
    deadline: Instant,
}

impl Cancellation for JobCancel {
    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFailure {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Default)]
struct JobState {
    status: JobStatus,
    records: Vec<IdentifierRecord>,
    failures: Vec<JobFailure>,
    cancelled: bool,
    error: Option<String>,
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

type JobMap = Arc<RwLock<HashMap<u64, Arc<Job>>>>;

/// One submitted bulk operation.
#[derive(Debug)]
pub struct Job {
    id: u64,
    operation: Operation,
    requested: usize,
    state: RwLock<JobState>,
}

/// A point-in-time view of a job, without its records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: u64,
    pub operation: Operation,
    pub status: JobStatus,
    pub requested: usize,
    pub completed: usize,
    pub failures: Vec<JobFailure>,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
}

impl Job {
    fn new(id: u64, operation: Operation, requested: usize) -> Self {
        Self {
            id,
            operation,
            requested,
            state: RwLock::new(JobState::default()),
        }
    }

    /// Records produced so far. Only populated once the job has finished.
    pub fn records(&self) -> Vec<IdentifierRecord> {
        self.state.read().records.clone()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.state.read();
        JobSnapshot {
            id: self.id,
            operation: self.operation,
            status: state.status,
            requested: self.requested,
            completed: state.records.len(),
            failures: state.failures.clone(),
            cancelled: state.cancelled,
            error: state.error.clone(),
            elapsed_ms: state
                .elapsed
                .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    fn start(&self) {
        let mut state = self.state.write();
        state.status = JobStatus::Running;
        state.started = Some(Instant::now());
    }

    fn finish(&self, outcome: BulkOutcome) {
        tracing::info!(
            job = self.id,
            operation = %self.operation,
            completed = outcome.records.len(),
            failed = outcome.failures.len(),
            cancelled = outcome.cancelled,
            "job finished"
        );
        let mut state = self.state.write();
        state.status = JobStatus::Finished;
        state.records = outcome.records;
        state.failures = outcome
            .failures
            .into_iter()
            .map(|failure| JobFailure {
                id: failure.id,
                error: failure.error.to_string(),
            })
            .collect();
        state.cancelled = outcome.cancelled;
        state.elapsed = state.started.map(|started| started.elapsed());
    }

    fn fail(&self, error: String) {
        tracing::warn!(job = self.id, operation = %self.operation, %error, "job failed");
        increment_job_failures();
        let mut state = self.state.write();
        state.status = JobStatus::Error;
        state.error = Some(error);
        state.elapsed = state.started.map(|started| started.elapsed());
    }
}

/// Tracks submitted jobs and bounds how many run at once.
#[derive(Debug)]
pub struct JobRegistry {
    next_id: AtomicU64,
    jobs: JobMap,
    permits: Arc<Semaphore>,
    shutdown_token: CancellationToken,
    accepting: AtomicBool,
    inflight: Arc<AtomicUsize>,
    job_timeout: Duration,
    retention: Duration,
}

impl JobRegistry {
    /// `retention` is how long a job stays queryable after it finishes or
    /// fails.
    pub fn new(max_concurrent_jobs: usize, job_timeout: Duration, retention: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            shutdown_token: CancellationToken::new(),
            accepting: AtomicBool::new(true),
            inflight: Arc::new(AtomicUsize::new(0)),
            job_timeout,
            retention,
        }
    }

    /// Queues `work` and returns its job immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ServiceShutdown`] once [`Self::shutdown`] has
    /// started.
    pub fn submit<F>(&self, operation: Operation, requested: usize, work: F) -> Result<Arc<Job>>
    where
        F: FnOnce(&JobCancel) -> sctid::Result<BulkOutcome> + Send + 'static,
    {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(ApiError::ServiceShutdown);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = Arc::new(Job::new(id, operation, requested));
        self.jobs.write().insert(id, Arc::clone(&job));
        tracing::debug!(job = id, %operation, requested, "job submitted");

        let permits = Arc::clone(&self.permits);
        let token = self.shutdown_token.child_token();
        let job_timeout = self.job_timeout;
        let retention = self.retention;
        let jobs = Arc::clone(&self.jobs);
        let inflight = Arc::clone(&self.inflight);
        let task_job = Arc::clone(&job);
        inflight.fetch_add(1, Ordering::AcqRel);

        tokio::spawn(async move {
            let job = task_job;
            let permit = tokio::select! {
                permit = permits.acquire_owned() => permit.ok(),
                () = token.cancelled() => None,
            };

            if let Some(_permit) = permit {
                job.start();
                let cancel = JobCancel {
                    token,
                    deadline: Instant::now() + job_timeout,
                };
                match tokio::task::spawn_blocking(move || work(&cancel)).await {
                    Ok(Ok(outcome)) => job.finish(outcome),
                    Ok(Err(err)) => job.fail(err.to_string()),
                    Err(err) => job.fail(format!("job task aborted: {err}")),
                }
            } else {
                job.fail(ApiError::ServiceShutdown.to_string());
            }
            inflight.fetch_sub(1, Ordering::AcqRel);

            sleep(retention).await;
            jobs.write().remove(&job.id);
            tracing::debug!(job = job.id, "job evicted");
        });

        Ok(job)
    }

    /// Looks up a job by id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::JobNotFound`] for unknown ids.
    pub fn get(&self, id: u64) -> Result<Arc<Job>> {
        self.jobs
            .read()
            .get(&id)
            .cloned()
            .ok_or(ApiError::JobNotFound { id })
    }

    /// Jobs that have not yet finished or failed.
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Stops accepting jobs, waits up to `drain_timeout` for running jobs to
    /// complete, then cancels whatever is left.
    pub async fn shutdown(&self, drain_timeout: Duration) {
        tracing::info!("Refusing new jobs");
        self.accepting.store(false, Ordering::Release);

        tracing::info!("Draining in-flight jobs ({} active)", self.inflight());
        let drained = timeout(drain_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                "Graceful drain timed out ({} jobs still active), cancelling",
                self.inflight()
            );
        }
        self.shutdown_token.cancel();
        self.permits.close();
    }
}
