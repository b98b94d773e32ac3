use thiserror::Error;

/// Problems found before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Usage(String),

    #[error("environment variable '{0}' not set")]
    MissingEnv(&'static str),

    #[error("invalid value for '{var}': {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error("no input files found in {0}")]
    NoInput(String),

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
