//! Error types for Evidence Bundle building and verification.

use thiserror::Error;

/// Bundle errors with specific exit codes.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Invalid argument: {field} must not be empty")]
    InvalidArgument { field: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a valid ZIP archive: {0}")]
    MalformedArchive(String),

    #[error("{entry} is malformed: {reason}")]
    MalformedContent { entry: String, reason: String },

    #[error("bundle_sha256 mismatch (expected: {expected}, actual: {actual})")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BundleError {
    /// Returns the exit code for this error.
    ///
    /// Codes 0-2 are reserved for verification verdicts.
    pub fn exit_code(&self) -> i32 {
        match self {
            BundleError::MalformedArchive(_) => 2,
            BundleError::MalformedContent { .. } => 2,
            BundleError::IntegrityMismatch { .. } => 2,
            BundleError::InvalidArgument { .. } => 3,
            BundleError::Json(_) => 3,
            BundleError::Io(_) => 4,
        }
    }

    pub(crate) fn malformed(entry: &str, reason: impl std::fmt::Display) -> Self {
        BundleError::MalformedContent {
            entry: entry.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for BundleError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => BundleError::Io(e),
            other => BundleError::MalformedArchive(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BundleError>;
