//! Turns a stream event into final result text.
//!
//! Small results arrive inline. Large ones are parked in the datalake and the
//! event only carries a [`BlobLocator`]; those are fetched and unwrapped here
//! so the listener sees a single text result either way.

use std::sync::Arc;

use crate::client::ApiClient;
use crate::protocol::{BlobBody, BlobLocator, EventResult, StreamEvent};

/// Why an event produced no text. Never fatal; the event is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unresolved {
    /// Blob resolution is switched off for this run.
    #[error("blob resolution disabled")]
    BlobsDisabled,
    /// The datalake answered non-2xx or the request failed.
    #[error("blob fetch failed: {0}")]
    FetchFailed(String),
    /// Body was not UTF-8 JSON.
    #[error("invalid blob body: {0}")]
    InvalidBody(String),
    /// Body parsed but had no `Final_Result`.
    #[error("blob has no Final_Result")]
    MissingResult,
}

pub struct ResultResolver {
    client: Arc<ApiClient>,
    resolve_blobs: bool,
}

impl ResultResolver {
    pub fn new(client: Arc<ApiClient>, resolve_blobs: bool) -> Self {
        Self {
            client,
            resolve_blobs,
        }
    }

    pub async fn resolve(&self, event: &StreamEvent) -> Result<String, Unresolved> {
        match &event.result {
            EventResult::Inline(text) => Ok(text.clone()),
            EventResult::Blob(_) if !self.resolve_blobs => Err(Unresolved::BlobsDisabled),
            EventResult::Blob(locator) => self.fetch(locator).await,
        }
    }

    async fn fetch(&self, locator: &BlobLocator) -> Result<String, Unresolved> {
        let bytes = self
            .client
            .fetch_blob(locator)
            .await
            .map_err(|e| Unresolved::FetchFailed(e.to_string()))?;
        extract_result(&bytes)
    }
}

/// Pull `Final_Result` out of a blob body.
pub fn extract_result(bytes: &[u8]) -> Result<String, Unresolved> {
    let text = std::str::from_utf8(bytes).map_err(|e| Unresolved::InvalidBody(e.to_string()))?;
    let body: BlobBody =
        serde_json::from_str(text).map_err(|e| Unresolved::InvalidBody(e.to_string()))?;
    body.final_result.ok_or(Unresolved::MissingResult)
}
