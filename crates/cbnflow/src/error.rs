//! Error types for the conversion client.
//!
//! Only [`RunError`] is fatal to a run. Everything that goes wrong once files
//! start flowing (a rejected submission, a broken stream, a missing blob) is
//! logged where it happens and degrades to "this one item is lost".

use thiserror::Error;

/// Failure talking to the conversion service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),

    #[error("invalid header value: {0}")]
    InvalidHeader(String),
}

impl ClientError {
    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Failure acquiring a bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Request(#[from] ClientError),

    #[error("token response did not contain an access_token")]
    MissingToken,
}

/// Fatal errors that abort a run before (or while listing) submissions.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("project lookup failed: {0}")]
    Lookup(#[source] ClientError),

    #[error("project '{name}' not found{}", .namespace.as_deref().map(|n| format!(" in namespace '{n}'")).unwrap_or_default())]
    ProjectNotFound {
        name: String,
        namespace: Option<String>,
    },

    #[error("failed to build http client: {0}")]
    Client(#[source] ClientError),

    #[error("invalid mode profile: {0}")]
    InvalidProfile(String),

    #[error("failed to list input directory {path}: {source}")]
    InputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
