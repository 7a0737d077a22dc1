use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while reading or extracting a package.
///
/// `InvalidFormat` and `CorruptHeader` are fatal for the whole package: once the
/// directory is suspect no entry can be trusted. The remaining variants are
/// reported per entry by the extractor and never abort sibling entries.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("package header invalid, {found} != {expected}")]
    InvalidFormat { expected: String, found: String },
    #[error("corrupt package header: {0}")]
    CorruptHeader(String),
    #[error(
        "corrupt payload for {name}: {expected} bytes at offset {offset}, only {available} available"
    )]
    CorruptPayload {
        name: String,
        offset: u64,
        expected: u64,
        available: u64,
    },
    #[error("entry name {0:?} escapes the destination directory")]
    UnsafePath(String),
    #[error("invalid format tag {0:?}: expected exactly 8 ASCII bytes")]
    InvalidTag(String),
    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl PackageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn header(msg: impl Into<String>) -> Self {
        PackageError::CorruptHeader(msg.into())
    }

    /// Whether this error invalidates the package as a whole.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PackageError::InvalidFormat { .. } | PackageError::CorruptHeader(_)
        )
    }
}

pub type Result<T, E = PackageError> = std::result::Result<T, E>;
