//! cbnflow: batch client for the asynchronous code conversion service.
//!
//! Submits a directory of sources as jobs, listens on the service's event
//! stream for their results, and writes each result next to its siblings
//! under the original file stem.

mod auth;
mod client;
mod codec;
mod config;
mod decode;
mod error;
mod listener;
mod mode;
mod project;
mod registry;
mod resolver;
mod run;
mod submitter;
mod tracker;

pub mod protocol;

/// Crate version, sent in the user agent.
pub const CBNFLOW_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use auth::{CredentialProvider, PasswordGrant, StaticToken};
pub use client::ApiClient;
pub use codec::{DATA_PREFIX, EventCodec};
pub use config::{RunConfig, ServiceConfig, Timings};
pub use decode::{DecodeTier, DecodedText, decode_source};
pub use error::{AuthError, ClientError, RunError};
pub use listener::{EventOutcome, ListenerExit, StreamListener, output_path};
pub use mode::{ModeProfile, RunMode, UnknownMode};
pub use project::{ProjectContext, find_project, select_project};
pub use registry::{CompletedSet, Job, JobRegistry};
pub use resolver::{ResultResolver, Unresolved};
pub use run::{MissingJob, RunSummary, run};
pub use submitter::{JobSubmitter, SkippedFile, SubmissionReport, list_input_files};
pub use tracker::{Completion, CompletionTracker};
pub use tokio_util::sync::CancellationToken;
