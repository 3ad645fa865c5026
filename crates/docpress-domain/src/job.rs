//! Upload jobs, phases, and progress
//!
//! Every mutating request creates exactly one [`UploadJob`]. The job owns a
//! cancellation token observed at each suspension point and a `watch` channel
//! carrying [`JobProgress`] snapshots for the request coordinator.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::constants::{
    DEADLINE_BLOCKS_ELEVATED, DEADLINE_BLOCKS_MAX, DEADLINE_TABLES_ELEVATED, DEADLINE_TABLES_MAX,
    JOB_DEADLINE_LADDER_SECS,
};

/// Phase of an upload job's state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Pre-flight checks and block-tree construction
    Validating,
    /// Deleting existing children of the target page
    Purging,
    /// Partitioning the tree into submissions
    Chunking,
    /// Appending chunks against the workspace
    Uploading,
    /// Stripping markers from the remote tree
    Sweeping,
    /// Best-effort page property refresh
    Finalizing,
    /// Terminal success
    Done,
    /// Terminal failure
    Failed,
}

impl JobPhase {
    /// Whether the phase is terminal
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Point-in-time progress of a job
#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    /// Current phase
    pub phase: JobPhase,
    /// Units finished within the phase
    pub completed_units: usize,
    /// Total units within the phase
    pub total_units: usize,
    /// Wall-clock time of the last observed activity
    pub last_activity_at: DateTime<Utc>,
}

impl JobProgress {
    fn starting() -> Self {
        Self {
            phase: JobPhase::Validating,
            completed_units: 0,
            total_units: 0,
            last_activity_at: Utc::now(),
        }
    }
}

/// One in-flight (or recently finished) upload job
#[derive(Debug)]
pub struct UploadJob {
    /// Request id this job serves
    pub request_id: String,
    /// Target page id, when known at creation
    pub page_id: Option<String>,
    /// Cooperative cancellation flag
    pub cancel: CancellationToken,
    /// Absolute deadline for the whole job
    pub deadline: Instant,
    /// Progress sender; coordinator holds the matching receiver
    progress_tx: watch::Sender<JobProgress>,
    /// Receiver template for subscribers
    progress_rx: watch::Receiver<JobProgress>,
    /// When the job reached a terminal phase
    finished_at: std::sync::Mutex<Option<Instant>>,
}

impl UploadJob {
    /// Create a job with the given deadline
    #[must_use]
    pub fn new(request_id: String, page_id: Option<String>, deadline: Duration) -> Self {
        let (progress_tx, progress_rx) = watch::channel(JobProgress::starting());
        Self {
            request_id,
            page_id,
            cancel: CancellationToken::new(),
            deadline: Instant::now() + deadline,
            progress_tx,
            progress_rx,
            finished_at: std::sync::Mutex::new(None),
        }
    }

    /// Publish a progress update
    pub fn report(&self, phase: JobPhase, completed_units: usize, total_units: usize) {
        let snapshot = JobProgress {
            phase,
            completed_units,
            total_units,
            last_activity_at: Utc::now(),
        };
        if phase.is_terminal() {
            let mut finished = self.finished_at.lock().unwrap_or_else(|p| p.into_inner());
            finished.get_or_insert_with(Instant::now);
        }
        // Send only fails when every receiver is gone; progress is advisory.
        let _ = self.progress_tx.send(snapshot);
    }

    /// Latest progress snapshot
    #[must_use]
    pub fn progress(&self) -> JobProgress {
        self.progress_rx.borrow().clone()
    }

    /// Subscribe to progress updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<JobProgress> {
        self.progress_rx.clone()
    }

    /// Flip the cancellation flag
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the deadline has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Time the job has been terminal, if it is
    #[must_use]
    pub fn terminal_age(&self) -> Option<Duration> {
        let finished = self.finished_at.lock().unwrap_or_else(|p| p.into_inner());
        finished.map(|at| at.elapsed())
    }
}

/// Pick the job deadline from the complexity ladder
///
/// Small jobs get the base deadline; block or table counts past the
/// configured thresholds escalate to the elevated and maximum rungs.
#[must_use]
pub fn deadline_for(block_count: usize, table_count: usize) -> Duration {
    let secs = if block_count > DEADLINE_BLOCKS_MAX || table_count > DEADLINE_TABLES_MAX {
        JOB_DEADLINE_LADDER_SECS[2]
    } else if block_count > DEADLINE_BLOCKS_ELEVATED || table_count > DEADLINE_TABLES_ELEVATED {
        JOB_DEADLINE_LADDER_SECS[1]
    } else {
        JOB_DEADLINE_LADDER_SECS[0]
    };
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_ladder_escalates() {
        assert_eq!(deadline_for(10, 0), Duration::from_secs(180));
        assert_eq!(deadline_for(301, 0), Duration::from_secs(300));
        assert_eq!(deadline_for(10, 31), Duration::from_secs(300));
        assert_eq!(deadline_for(501, 0), Duration::from_secs(480));
        assert_eq!(deadline_for(0, 51), Duration::from_secs(480));
    }

    #[test]
    fn progress_updates_are_observable() {
        let job = UploadJob::new("req-1".to_owned(), None, Duration::from_secs(60));
        job.report(JobPhase::Uploading, 3, 10);
        let progress = job.progress();
        assert_eq!(progress.phase, JobPhase::Uploading);
        assert_eq!(progress.completed_units, 3);
        assert_eq!(progress.total_units, 10);
    }

    #[test]
    fn cancel_flag_is_sticky() {
        let job = UploadJob::new("req-2".to_owned(), None, Duration::from_secs(60));
        assert!(!job.is_cancelled());
        job.request_cancel();
        assert!(job.is_cancelled());
    }

    #[test]
    fn terminal_age_only_after_terminal_phase() {
        let job = UploadJob::new("req-3".to_owned(), None, Duration::from_secs(60));
        assert!(job.terminal_age().is_none());
        job.report(JobPhase::Done, 1, 1);
        assert!(job.terminal_age().is_some());
    }
}
