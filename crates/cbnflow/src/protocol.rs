//! Wire types for the conversion service.
//!
//! Request/response bodies for token, project, submission and blob calls, plus
//! the raw event shape carried on the server-push stream. Raw events are
//! normalised into [`StreamEvent`] before anything else looks at them.

use serde::{Deserialize, Serialize};

/// Type marker of an event whose result lives in the datalake.
pub const BLOB_EVENT_TYPE: &str = "Blob";

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    pub id: String,
    pub wallet_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectList {
    #[serde(default)]
    pub results: Vec<Project>,
}

/// Body posted once per source file.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest<'a> {
    pub project_id: &'a str,
    pub wallet_id: &'a str,
    pub data: SubmitData<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitData<'a> {
    pub content: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub execution_id: Option<String>,
}

/// `data:` payload of one stream line, as sent.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub data: Option<RawEventData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEventData {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(rename = "Final_Result", default)]
    pub final_result: Option<String>,
}

/// Body of a fetched blob.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobBody {
    #[serde(rename = "Final_Result", default)]
    pub final_result: Option<String>,
}

/// Identifies a result stored out of band.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobLocator {
    pub container: String,
    pub blob_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventResult {
    /// Final text carried in the event itself.
    Inline(String),
    /// Final text must be fetched from the datalake.
    Blob(BlobLocator),
}

/// A stream event that refers to a job and carries (or points at) a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub job_id: String,
    pub result: EventResult,
}

impl StreamEvent {
    pub fn inline(job_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            result: EventResult::Inline(text.into()),
        }
    }

    pub fn blob(
        job_id: impl Into<String>,
        container: impl Into<String>,
        blob_id: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            result: EventResult::Blob(BlobLocator {
                container: container.into(),
                blob_id: blob_id.into(),
            }),
        }
    }
}

impl RawEvent {
    /// Normalise into a [`StreamEvent`].
    ///
    /// Returns None for events without a job id, blob events missing their
    /// locator, and progress events with no (or an empty) final result.
    pub fn into_event(self) -> Option<StreamEvent> {
        let job_id = self.id.filter(|id| !id.is_empty())?;
        let data = self.data.unwrap_or_default();

        if data.kind.as_deref() == Some(BLOB_EVENT_TYPE) {
            let blob_id = data.id.filter(|s| !s.is_empty())?;
            let container = data.container.filter(|s| !s.is_empty())?;
            return Some(StreamEvent::blob(job_id, container, blob_id));
        }

        let text = data.final_result.filter(|s| !s.is_empty())?;
        Some(StreamEvent::inline(job_id, text))
    }
}
