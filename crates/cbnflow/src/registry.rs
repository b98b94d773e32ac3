//! Shared job state for a single run.
//!
//! Two structures are shared between the submitter, the stream listener and
//! the completion tracker:
//! - [`JobRegistry`]: job id -> originating file. Populated by the submitter,
//!   read by the listener while the submitter may still be writing.
//! - [`CompletedSet`]: job ids whose result has been written. Populated by the
//!   listener, polled by the tracker. Grows monotonically.
//!
//! Both are cheap to clone handles over a DashMap/DashSet and live exactly as
//! long as the run that created them.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};

/// One file's submission, tracked by its server-issued id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub job_id: String,
    pub filename: String,
    pub decoded: bool,
}

impl Job {
    pub fn new(job_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            filename: filename.into(),
            decoded: false,
        }
    }
}

/// Map from job id to the submitted file.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<DashMap<String, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly submitted job.
    ///
    /// Re-registering an id keeps its `decoded` flag unless the filename
    /// changes.
    pub fn register(&self, job_id: impl Into<String>, filename: impl Into<String>) {
        let job = Job::new(job_id, filename);
        self.jobs
            .entry(job.job_id.clone())
            .and_modify(|existing| {
                if existing.filename != job.filename {
                    existing.filename = job.filename.clone();
                    existing.decoded = false;
                }
            })
            .or_insert(job);
    }

    /// Filename for `job_id`, if the submitter has registered it yet.
    pub fn filename(&self, job_id: &str) -> Option<String> {
        self.jobs.get(job_id).map(|j| j.filename.clone())
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.get(job_id).map(|j| j.clone())
    }

    /// Flag a job as having its result written. Returns false for unknown ids.
    pub fn mark_decoded(&self, job_id: &str) -> bool {
        match self.jobs.get_mut(job_id) {
            Some(mut job) => {
                job.decoded = true;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.jobs.contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Set of job ids whose result has been written to disk.
#[derive(Debug, Clone, Default)]
pub struct CompletedSet {
    ids: Arc<DashSet<String>>,
}

impl CompletedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record completion. Returns true the first time an id is recorded.
    pub fn insert(&self, job_id: impl Into<String>) -> bool {
        self.ids.insert(job_id.into())
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.ids.contains(job_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids from `expected` not yet completed, in input order.
    pub fn missing<'a>(&self, expected: &'a [String]) -> Vec<&'a String> {
        expected.iter().filter(|id| !self.contains(id)).collect()
    }
}
