//! Job registry
//!
//! Process-wide table of in-flight (and recently terminal) upload jobs keyed
//! by request id, used for cancellation and progress reporting. A background
//! sweeper evicts terminal jobs once they outlive the configured TTL.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use docpress_domain::constants::DEFAULT_JOB_TTL_SECS;
use docpress_domain::{JobProgress, UploadJob};
use tracing::debug;

/// Shared registry of upload jobs
#[derive(Debug)]
pub struct JobRegistry {
    jobs: DashMap<String, Arc<UploadJob>>,
    ttl: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_JOB_TTL_SECS))
    }
}

impl JobRegistry {
    /// Create a registry whose terminal jobs expire after `ttl`
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            ttl,
        }
    }

    /// Register a job under its request id
    ///
    /// There is exactly one job per request id; a duplicate id replaces the
    /// stale entry (request ids are uuids, so this only happens in tests).
    pub fn insert(&self, job: Arc<UploadJob>) {
        self.jobs.insert(job.request_id.clone(), job);
    }

    /// Look up a job
    #[must_use]
    pub fn get(&self, request_id: &str) -> Option<Arc<UploadJob>> {
        self.jobs.get(request_id).map(|entry| Arc::clone(&entry))
    }

    /// Progress snapshot for a job, when present
    #[must_use]
    pub fn progress(&self, request_id: &str) -> Option<JobProgress> {
        self.get(request_id).map(|job| job.progress())
    }

    /// Flip a job's cancellation flag; true when the job existed
    ///
    /// Cancelling one job never affects another: the flag lives on the job's
    /// own token.
    pub fn cancel(&self, request_id: &str) -> bool {
        match self.get(request_id) {
            Some(job) => {
                job.request_cancel();
                true
            }
            None => false,
        }
    }

    /// Number of registered jobs
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Drop terminal jobs older than the TTL; returns how many were evicted
    pub fn evict_expired(&self) -> usize {
        let ttl = self.ttl;
        let before = self.jobs.len();
        self.jobs
            .retain(|_, job| job.terminal_age().is_none_or(|age| age < ttl));
        let evicted = before - self.jobs.len();
        if evicted > 0 {
            debug!(evicted, "expired jobs evicted");
        }
        evicted
    }

    /// Spawn the background eviction sweeper
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                registry.evict_expired();
            }
        })
    }
}
