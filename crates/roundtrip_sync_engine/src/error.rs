//! Error types for the sync engines.

use crate::compare::ComparisonToolError;
use roundtrip_mirror::MirrorError;
use roundtrip_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during pull, push or diff.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote API could not be reached, rejected the request, or sent an
    /// unusable payload.
    #[error("{message}")]
    RemoteFetch {
        /// Error message.
        message: String,
        /// Whether the request can be retried.
        retryable: bool,
    },

    /// A file system operation on the mirror failed.
    #[error(transparent)]
    LocalIo(MirrorError),

    /// Stored metadata or a payload is malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The external comparison tool or pager failed.
    #[error(transparent)]
    ComparisonTool(#[from] ComparisonToolError),

    /// The user asked to stop.
    #[error("aborted by user")]
    Aborted,
}

impl SyncError {
    /// Creates a retryable remote error.
    pub fn remote_retryable(message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable remote error.
    pub fn remote_fatal(message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::RemoteFetch { retryable: true, .. })
    }
}

impl From<MirrorError> for SyncError {
    fn from(err: MirrorError) -> Self {
        if err.is_validation() {
            SyncError::Validation(err.to_string())
        } else {
            SyncError::LocalIo(err)
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        SyncError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::remote_retryable("503 Service Unavailable").is_retryable());
        assert!(!SyncError::remote_fatal("401 Unauthorized").is_retryable());
        assert!(!SyncError::Aborted.is_retryable());
    }

    #[test]
    fn mirror_errors_split_by_kind() {
        let io_err = MirrorError::Io {
            path: "page.xml".into(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(matches!(SyncError::from(io_err), SyncError::LocalIo(_)));

        let bad = MirrorError::Metadata {
            path: "page.json".into(),
            source: ProtocolError::NotAnObject { entity: "page" },
        };
        assert!(matches!(SyncError::from(bad), SyncError::Validation(_)));
    }

    #[test]
    fn comparison_errors_display_verbatim() {
        let err = SyncError::from(ComparisonToolError::TimedOut);
        assert_eq!(err.to_string(), "Diff command timed out");
    }
}
