//! Error taxonomy for the mapping core.
//!
//! Only conditions the caller must act on become a [`MapError`]. Degraded
//! conditions (missing ignore files, a cache that cannot be written, a file
//! that cannot be read for dependency extraction) are logged and recorded
//! in the run result instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the mapping core.
#[derive(Debug, Error)]
pub enum MapError {
    /// A batch run was configured with a window size of zero.
    #[error("concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),

    /// The directory handed to the mapper does not exist.
    #[error("directory does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    /// Filesystem failure tied to a specific path.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An item failed while the run was configured to stop on first error.
    #[error("processing {item} failed: {message}")]
    ItemFailed { item: String, message: String },
}

impl MapError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MapError>;
