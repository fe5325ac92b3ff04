//! Delayed, deduplicated, at-most-one-pending-per-key task dispatch (§4.1).
//!
//! No durable broker backs this — an in-process async worker pool
//! satisfies the contract (§9 Design Notes: "Durable queue with dedupe").
//! A real deployment plugs a persistent queue in at this same interface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore, watch};
use tracing::{error, info, warn};

use crate::models::ReviewTrigger;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub enum JobPayload {
    ProcessPullRequest {
        installation_id: i64,
        repo_full_name: String,
        pr_number: u64,
        trigger: ReviewTrigger,
        expected_head_sha: Option<String>,
    },
    ProcessCommentCommand {
        installation_id: i64,
        repo_full_name: String,
        pr_number: u64,
        comment_body: String,
        comment_author: String,
    },
}

impl JobPayload {
    /// `process_pull_request` retries up to 3 times, `process_comment_command`
    /// up to 2 — matching the source's `@app.task(retry=...)` declarations.
    fn max_retries(&self) -> u32 {
        match self {
            JobPayload::ProcessPullRequest { .. } => 3,
            JobPayload::ProcessCommentCommand { .. } => 2,
        }
    }

    fn task_name(&self) -> &'static str {
        match self {
            JobPayload::ProcessPullRequest { .. } => "process_pull_request",
            JobPayload::ProcessCommentCommand { .. } => "process_comment_command",
        }
    }
}

#[derive(Debug, Clone)]
struct Job {
    payload: JobPayload,
    run_at: Instant,
    attempt: u32,
}

#[derive(Default)]
struct JobSlot {
    pending: Option<Job>,
    running: bool,
}

pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, payload: &JobPayload) -> crate::error::ReviewResult<()>;
}

pub struct Scheduler<H: JobHandler> {
    handler: Arc<H>,
    slots: Arc<Mutex<HashMap<String, JobSlot>>>,
    permits: Arc<Semaphore>,
}

impl<H: JobHandler> Scheduler<H> {
    pub fn new(handler: Arc<H>, worker_pool_size: usize) -> Self {
        Self {
            handler,
            slots: Arc::new(Mutex::new(HashMap::new())),
            permits: Arc::new(Semaphore::new(worker_pool_size.max(1))),
        }
    }

    /// Submits `payload` keyed by `lock_key` with a `delay` before it
    /// becomes eligible to run. A pending job under the same key is
    /// replaced outright; a running one is left alone and this becomes
    /// its successor's pending slot.
    pub async fn submit(&self, lock_key: impl Into<String>, payload: JobPayload, delay: Duration) {
        let lock_key = lock_key.into();
        let job = Job { payload, run_at: Instant::now() + delay, attempt: 0 };

        let mut slots = self.slots.lock().await;
        let slot = slots.entry(lock_key.clone()).or_default();
        if slot.pending.is_some() {
            info!(lock_key, "replacing pending job with newer submission");
        }
        slot.pending = Some(job);
    }

    /// The worker loop: polls for jobs whose `run_at` has passed and no
    /// sibling is already running under the same key, and dispatches them
    /// onto the bounded pool. Runs until `shutdown` reports `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler shutting down, draining in-flight jobs");
                        return;
                    }
                }
            }

            let ready: Vec<(String, Job)> = {
                let mut slots = self.slots.lock().await;
                let now = Instant::now();
                let mut ready = Vec::new();
                for (key, slot) in slots.iter_mut() {
                    if slot.running {
                        continue;
                    }
                    if let Some(job) = &slot.pending {
                        if job.run_at <= now {
                            ready.push((key.clone(), slot.pending.take().unwrap()));
                            slot.running = true;
                        }
                    }
                }
                ready
            };

            for (lock_key, job) in ready {
                let handler = Arc::clone(&self.handler);
                let slots = Arc::clone(&self.slots);
                let permits = Arc::clone(&self.permits);
                tokio::spawn(async move {
                    let _permit = permits.acquire().await.expect("semaphore never closed");
                    run_job(handler, slots, lock_key, job).await;
                });
            }
        }
    }
}

async fn run_job<H: JobHandler>(
    handler: Arc<H>,
    slots: Arc<Mutex<HashMap<String, JobSlot>>>,
    lock_key: String,
    mut job: Job,
) {
    let task_name = job.payload.task_name();
    match handler.handle(&job.payload).await {
        Ok(()) => {
            info!(lock_key, task_name, attempt = job.attempt, "job completed");
        }
        Err(err) if err.is_retryable() && job.attempt < job.payload.max_retries() => {
            job.attempt += 1;
            let backoff = Duration::from_secs(2u64.saturating_pow(job.attempt));
            warn!(lock_key, task_name, attempt = job.attempt, error = %err, "job failed, retrying with backoff");
            job.run_at = Instant::now() + backoff;
            let mut slots_guard = slots.lock().await;
            let slot = slots_guard.entry(lock_key.clone()).or_default();
            slot.running = false;
            // A successor may have already queued a pending replacement while
            // we were retrying; don't clobber it with the stale retry.
            if slot.pending.is_none() {
                slot.pending = Some(job);
            }
            return;
        }
        Err(err) => {
            error!(lock_key, task_name, attempt = job.attempt, error = %err, "job failed terminally");
        }
    }

    let mut slots_guard = slots.lock().await;
    if let Some(slot) = slots_guard.get_mut(&lock_key) {
        slot.running = false;
    }
}
