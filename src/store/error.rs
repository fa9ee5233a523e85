//! Store error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::control::CommandError;

/// Operational failure of a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Name cannot be used as a file name.
    #[error("invalid site name {0:?}")]
    InvalidName(String),

    /// Unit is missing a field every site file needs.
    #[error("site has an empty `{0}`")]
    InvalidUnit(&'static str),

    /// Filesystem operation failed.
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The reload command failed after the change was written.
    #[error("server reload failed: {0}")]
    Reload(#[source] CommandError),

    /// The certificate issuance command failed.
    #[error("certificate issuance failed: {0}")]
    Certificate(#[source] CommandError),
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Kind of the underlying filesystem error, if this is one.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
