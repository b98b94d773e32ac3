//! One conversion run, end to end.
//!
//! Flow:
//! 1. Validate the mode profile
//! 2. Acquire a token and look up the project (fatal on failure)
//! 3. Spawn the stream listener and give it a head start
//! 4. Submit files, populating the job registry
//! 5. Wait for completion or the deadline
//! 6. Cancel the listener and collect its exit reason

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::CredentialProvider;
use crate::client::ApiClient;
use crate::config::{RunConfig, ServiceConfig};
use crate::error::RunError;
use crate::listener::{ListenerExit, StreamListener};
use crate::project::find_project;
use crate::registry::{CompletedSet, JobRegistry};
use crate::resolver::ResultResolver;
use crate::submitter::{JobSubmitter, SkippedFile};
use crate::tracker::{Completion, CompletionTracker};

/// A job that never produced a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingJob {
    pub job_id: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub submitted: usize,
    pub skipped: Vec<SkippedFile>,
    pub completion: Completion,
    pub missing: Vec<MissingJob>,
    pub listener: ListenerExit,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.completion.is_complete()
    }
}

/// Run one batch against the service.
pub async fn run(
    service: &ServiceConfig,
    config: &RunConfig,
    credentials: &dyn CredentialProvider,
) -> Result<RunSummary, RunError> {
    config.profile.validate()?;
    let timings = config.timings;

    let token = credentials.token().await?;
    let client = Arc::new(
        ApiClient::new(&service.base_url, Some(&token), timings.request_timeout)
            .map_err(RunError::Client)?,
    );
    let project = find_project(&client, &service.project, service.namespace.as_deref()).await?;

    let registry = JobRegistry::new();
    let completed = CompletedSet::new();

    let cancel = CancellationToken::new();
    let listener = StreamListener::new(
        Arc::clone(&client),
        ResultResolver::new(Arc::clone(&client), config.resolve_blobs),
        registry.clone(),
        completed.clone(),
        &config.output_dir,
        &config.profile.output_extension,
    );
    let mut listener_task = listener.spawn(cancel.clone());

    tokio::time::sleep(timings.connect_grace).await;

    let submitter = JobSubmitter::new(
        Arc::clone(&client),
        config.profile.clone(),
        project,
        registry.clone(),
    );
    let report = match submitter.submit_dir(&config.input_dir).await {
        Ok(report) => report,
        Err(e) => {
            cancel.cancel();
            listener_task.abort();
            return Err(e);
        }
    };

    let tracker = CompletionTracker::new(completed, timings.poll_interval);
    let completion = tracker
        .wait(&report.job_ids, timings.completion_deadline)
        .await;

    cancel.cancel();
    let listener_exit =
        match tokio::time::timeout(timings.shutdown_timeout, &mut listener_task).await {
            Ok(Ok(exit)) => exit,
            Ok(Err(e)) => ListenerExit::Aborted(e.to_string()),
            Err(_) => {
                listener_task.abort();
                ListenerExit::Aborted("listener did not stop in time".to_string())
            }
        };
    tracing::debug!(exit = ?listener_exit, "Stream listener finished");

    let missing = match &completion {
        Completion::Complete { .. } => Vec::new(),
        Completion::TimedOut { missing } => missing
            .iter()
            .map(|job_id| MissingJob {
                job_id: job_id.clone(),
                filename: registry.filename(job_id).unwrap_or_default(),
            })
            .collect(),
    };

    Ok(RunSummary {
        submitted: report.job_ids.len(),
        skipped: report.skipped,
        completion,
        missing,
        listener: listener_exit,
    })
}
