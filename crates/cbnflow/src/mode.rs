//! Run modes and their routing profile.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RunError;

/// Kind of source being converted. Selects the workflow endpoint, the input
/// encoding and the extension of written results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Datastage,
    StoredProcedure,
    Cpp,
    Documentation,
}

impl RunMode {
    pub fn all() -> [RunMode; 4] {
        [
            Self::Datastage,
            Self::StoredProcedure,
            Self::Cpp,
            Self::Documentation,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Datastage => "datastage",
            Self::StoredProcedure => "stored_procedure",
            Self::Cpp => "cpp",
            Self::Documentation => "documentation",
        }
    }

    pub fn profile(&self) -> ModeProfile {
        match self {
            Self::Datastage => ModeProfile::new("datastage", "utf-8", "js"),
            // Stored procedures share the C++ workflow on the service side.
            Self::StoredProcedure | Self::Cpp => ModeProfile::new("cpp", "utf-8", "js"),
            Self::Documentation => ModeProfile::new("documentation", "utf-8", "md"),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}', expected one of: datastage, stored_procedure, cpp, documentation")]
pub struct UnknownMode(pub String);

impl FromStr for RunMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

/// Endpoint suffix, input encoding and output extension for one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeProfile {
    /// Workflow suffix: submissions go to `dags/api-workflow-<suffix>-01`.
    pub endpoint_suffix: String,
    /// WHATWG encoding label tried first when reading inputs.
    pub encoding: String,
    /// Extension (without dot) of written results.
    pub output_extension: String,
}

impl ModeProfile {
    pub fn new(suffix: &str, encoding: &str, extension: &str) -> Self {
        Self {
            endpoint_suffix: suffix.to_string(),
            encoding: encoding.to_string(),
            output_extension: extension.to_string(),
        }
    }

    /// Workflow path segment for this profile.
    pub fn workflow(&self) -> String {
        format!("api-workflow-{}-01", self.endpoint_suffix)
    }

    /// Reject profiles that would only fail later, mid-batch.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.endpoint_suffix.is_empty() {
            return Err(RunError::InvalidProfile("empty endpoint suffix".to_string()));
        }
        if self.endpoint_suffix.contains('/') {
            return Err(RunError::InvalidProfile(format!(
                "endpoint suffix '{}' contains '/'",
                self.endpoint_suffix
            )));
        }
        if self.output_extension.is_empty() || self.output_extension.contains(&['.', '/'][..]) {
            return Err(RunError::InvalidProfile(format!(
                "bad output extension '{}'",
                self.output_extension
            )));
        }
        if encoding_rs::Encoding::for_label(self.encoding.as_bytes()).is_none() {
            return Err(RunError::InvalidProfile(format!(
                "unknown encoding '{}'",
                self.encoding
            )));
        }
        Ok(())
    }
}
