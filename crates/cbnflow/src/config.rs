//! Run configuration.
//!
//! Everything here is already validated by the caller; the engine only
//! consumes it.

use std::path::PathBuf;
use std::time::Duration;

use crate::mode::{ModeProfile, RunMode};

/// Where the conversion service lives and who we are to it.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the workflow API (projects, dags, stream, datalake).
    pub base_url: String,
    /// Token endpoint for the password grant.
    pub auth_url: String,
    pub username: String,
    pub client_id: String,
    /// Project to submit into.
    pub project: String,
    /// When set, the project must also live in this namespace.
    pub namespace: Option<String>,
}

/// Wait and timeout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Head start given to the stream listener before the first submission.
    pub connect_grace: Duration,
    /// How long to wait for all results once submission is done.
    pub completion_deadline: Duration,
    /// Completion poll interval.
    pub poll_interval: Duration,
    /// Timeout for ordinary request/response calls. The stream has none.
    pub request_timeout: Duration,
    /// How long to wait for the listener task to wind down after cancel.
    pub shutdown_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            connect_grace: Duration::from_secs(2),
            completion_deadline: Duration::from_secs(600),
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// One batch: which files, which workflow, where results go.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: RunMode,
    pub profile: ModeProfile,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Follow blob references in stream events. When off they are dropped.
    pub resolve_blobs: bool,
    pub timings: Timings,
}

impl RunConfig {
    pub fn new(mode: RunMode, input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            profile: mode.profile(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            resolve_blobs: true,
            timings: Timings::default(),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_resolve_blobs(mut self, resolve: bool) -> Self {
        self.resolve_blobs = resolve;
        self
    }
}
