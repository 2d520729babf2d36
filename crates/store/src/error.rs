//! Error types for store operations

use std::io;
use std::path::PathBuf;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key must not be empty")]
    EmptyKey,

    #[error("invalid store name {name:?}: expected a non-empty file stem")]
    InvalidName { name: String },

    #[error("could not determine a configuration directory (set XDG_CONFIG_HOME or pass a path)")]
    NoConfigHome,

    #[error("date-store does not have permission to access {}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} exists and is not a directory", path.display())]
    DirectoryBlocked { path: PathBuf },

    #[error("no valid date stored for key {key:?}")]
    NotADate { key: String },

    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    /// Classify an I/O failure on `path`, splitting out permission problems
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            StoreError::Access { path, source }
        } else {
            StoreError::Io { path, source }
        }
    }
}
