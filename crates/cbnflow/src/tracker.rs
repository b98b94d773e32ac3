//! Waits for every submitted job to reach the completed set.

use std::time::Duration;

use tokio::time::Instant;

use crate::registry::CompletedSet;

/// Outcome of waiting on a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Every job's result was written.
    Complete { jobs: usize },
    /// The deadline passed first. `missing` lists the outstanding ids,
    /// sorted.
    TimedOut { missing: Vec<String> },
}

impl Completion {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn missing_count(&self) -> usize {
        match self {
            Self::Complete { .. } => 0,
            Self::TimedOut { missing } => missing.len(),
        }
    }
}

pub struct CompletionTracker {
    completed: CompletedSet,
    poll_interval: Duration,
}

impl CompletionTracker {
    pub fn new(completed: CompletedSet, poll_interval: Duration) -> Self {
        Self {
            completed,
            poll_interval,
        }
    }

    /// Poll until all of `job_ids` are complete or `deadline` has elapsed.
    pub async fn wait(&self, job_ids: &[String], deadline: Duration) -> Completion {
        let deadline_at = Instant::now() + deadline;
        tracing::info!(
            jobs = job_ids.len(),
            deadline_secs = deadline.as_secs(),
            "Waiting for stream results"
        );

        loop {
            let missing = self.completed.missing(job_ids);
            if missing.is_empty() {
                tracing::info!(jobs = job_ids.len(), "All results received from stream");
                return Completion::Complete {
                    jobs: job_ids.len(),
                };
            }

            let now = Instant::now();
            if now >= deadline_at {
                let mut missing: Vec<String> = missing.into_iter().cloned().collect();
                missing.sort();
                tracing::warn!(
                    missing = missing.len(),
                    "Timeout reached, some results may be missing"
                );
                return Completion::TimedOut { missing };
            }

            tracing::trace!(outstanding = missing.len(), "Still waiting");
            tokio::time::sleep(self.poll_interval.min(deadline_at - now)).await;
        }
    }
}
