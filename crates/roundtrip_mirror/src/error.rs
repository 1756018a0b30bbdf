//! Error types for mirror operations.

use roundtrip_protocol::ProtocolError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Errors that can occur while reading or writing the local mirror.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// A file system operation failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// A metadata document is not valid JSON.
    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        /// Path of the document.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// A metadata document is valid JSON but not a usable page snapshot.
    #[error("malformed metadata in {}: {source}", .path.display())]
    Metadata {
        /// Path of the document.
        path: PathBuf,
        /// Conversion error.
        source: ProtocolError,
    },

    /// Directory traversal failed.
    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        /// Root of the traversal.
        path: PathBuf,
        /// Underlying error.
        source: walkdir::Error,
    },
}

impl MirrorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error is about malformed stored metadata rather
    /// than a failing file system.
    pub fn is_validation(&self) -> bool {
        matches!(self, MirrorError::Json { .. } | MirrorError::Metadata { .. })
    }
}
