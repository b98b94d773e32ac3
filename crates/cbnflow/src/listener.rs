//! Stream listener - correlates pushed results with submitted jobs.
//!
//! Flow:
//! 1. Open the event stream (before any job is submitted)
//! 2. Decode events in arrival order with [`EventCodec`]
//! 3. Look each job id up in the [`JobRegistry`]; unknown ids are dropped
//! 4. Resolve the result (inline or blob) and write `<stem>.<ext>`
//! 5. Record the id in the [`CompletedSet`]
//!
//! Transport failures end the listener; they never propagate. The completion
//! tracker's deadline covers a stream that never delivers.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::client::ApiClient;
use crate::codec::EventCodec;
use crate::protocol::StreamEvent;
use crate::registry::{CompletedSet, JobRegistry};
use crate::resolver::{ResultResolver, Unresolved};

/// Why the listener stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerExit {
    /// Cancelled by the run once tracking finished.
    Cancelled,
    /// Server closed the stream.
    StreamEnded,
    /// Could not open the stream.
    ConnectFailed(String),
    /// Stream broke mid-read.
    ReadFailed(String),
    /// Listener task panicked or did not stop in time.
    Aborted(String),
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Written { job_id: String, path: PathBuf },
    UnknownJob,
    Unresolved(Unresolved),
    WriteFailed(String),
}

/// Output file for a registered input filename: `<dir>/<stem>.<ext>`.
pub fn output_path(dir: &Path, filename: &str, extension: &str) -> PathBuf {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    dir.join(format!("{stem}.{extension}"))
}

pub struct StreamListener {
    client: Arc<ApiClient>,
    resolver: ResultResolver,
    registry: JobRegistry,
    completed: CompletedSet,
    output_dir: PathBuf,
    extension: String,
}

impl StreamListener {
    pub fn new(
        client: Arc<ApiClient>,
        resolver: ResultResolver,
        registry: JobRegistry,
        completed: CompletedSet,
        output_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            client,
            resolver,
            registry,
            completed,
            output_dir: output_dir.into(),
            extension: extension.into(),
        }
    }

    /// Run on a background task until the stream ends or `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<ListenerExit> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    pub async fn run(self, cancel: CancellationToken) -> ListenerExit {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ListenerExit::Cancelled,
            response = self.client.open_stream() => match response {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to open event stream");
                    return ListenerExit::ConnectFailed(e.to_string());
                }
            },
        };

        tracing::info!("Listening for results on event stream");

        let body = response.bytes_stream().map_err(io::Error::other).boxed();
        let mut events = FramedRead::new(StreamReader::new(body), EventCodec::new());

        let exit = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break ListenerExit::Cancelled,
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    self.handle_event(&event).await;
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Event stream read failed");
                    break ListenerExit::ReadFailed(e.to_string());
                }
                None => {
                    tracing::warn!("Event stream closed by server");
                    break ListenerExit::StreamEnded;
                }
            }
        };

        tracing::debug!(
            skipped = events.decoder().skipped(),
            "Event stream listener stopped"
        );
        exit
    }

    /// Resolve one event and write its result if it belongs to this run.
    pub async fn handle_event(&self, event: &StreamEvent) -> EventOutcome {
        let job_id = event.job_id.as_str();

        let Some(filename) = self.registry.filename(job_id) else {
            tracing::debug!(job_id, "Ignoring event for unknown job");
            return EventOutcome::UnknownJob;
        };

        let text = match self.resolver.resolve(event).await {
            Ok(text) => text,
            Err(reason) => {
                tracing::warn!(job_id, filename = %filename, reason = %reason, "Result unresolved");
                return EventOutcome::Unresolved(reason);
            }
        };

        let path = output_path(&self.output_dir, &filename, &self.extension);
        if let Err(e) = tokio::fs::write(&path, text.as_bytes()).await {
            tracing::error!(job_id, path = %path.display(), error = %e, "Failed to write result");
            return EventOutcome::WriteFailed(e.to_string());
        }

        self.registry.mark_decoded(job_id);
        if self.completed.insert(job_id) {
            tracing::info!(job_id, path = %path.display(), "File created");
        } else {
            tracing::debug!(job_id, path = %path.display(), "Duplicate result rewritten");
        }

        EventOutcome::Written {
            job_id: job_id.to_string(),
            path,
        }
    }
}
