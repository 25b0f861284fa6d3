use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("corrupt cache record: {detail}")]
    CorruptRecord { detail: String },

    #[error("cache format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("failed to acquire cache lock {path}: {source}")]
    LockAcquisition { path: PathBuf, source: io::Error },

    #[error("cache I/O failure ({context}): {source}")]
    Io { context: String, source: io::Error },
}

impl CacheError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        CacheError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn corrupt(detail: impl Into<String>) -> Self {
        CacheError::CorruptRecord {
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        CacheError::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Attach the offending key to an I/O or corruption failure so that
    /// diagnostics name the cache slot, not just the file.
    pub(crate) fn for_key(self, key: &dyn fmt::Display) -> Self {
        match self {
            CacheError::Io { context, source } => CacheError::Io {
                context: format!("{context}; key {key}"),
                source,
            },
            CacheError::CorruptRecord { detail } => CacheError::CorruptRecord {
                detail: format!("{detail}; key {key}"),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
