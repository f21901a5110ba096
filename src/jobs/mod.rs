//! Background jobs: identity, worker pool and the execution modes.
//!
//! A [`Job`] is just an id plus a type tag; the tag names the event channel
//! the job reports on. Jobs run either inline (tests, one-shot CLI use) or
//! on a semaphore-bounded worker pool.

pub mod fix_match;
pub mod manual_match;
pub mod scan;

use std::future::Future;
use std::sync::Arc;
use std::thread;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

pub use fix_match::FixMatchJob;
pub use manual_match::ManualMatchJob;
pub use scan::ScanJob;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    MediaScanner,
    ManualMatch,
    FixMatch,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::MediaScanner => "media_scanner",
            JobType::ManualMatch => "manual_match",
            JobType::FixMatch => "fix_match",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
}

impl Job {
    pub fn new(job_type: JobType) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type,
        }
    }
}

/// Bounded pool of job tasks. A semaphore caps concurrency; every spawned
/// task holds a permit for its whole lifetime.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Leave two cores for the runtime and whatever serves requests.
    pub fn default_workers() -> usize {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .saturating_sub(2)
            .max(2)
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                debug!("worker pool closed, dropping job");
                return;
            };
            future.await;
        })
    }

    /// Stop accepting work. Tasks already holding a permit finish; queued
    /// ones are dropped.
    pub fn shutdown(&self) {
        self.permits.close();
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(Self::default_workers())
    }
}

/// How submitted jobs run: pooled in the background, or inline on the
/// caller's task.
#[derive(Debug, Clone)]
pub enum JobExecutor {
    Pool(WorkerPool),
    Simple,
}

impl JobExecutor {
    pub async fn submit<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self {
            JobExecutor::Pool(pool) => {
                let _ = pool.spawn(future);
            }
            JobExecutor::Simple => future.await,
        }
    }
}
