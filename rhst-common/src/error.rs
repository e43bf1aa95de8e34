//! Error type for RHST stream and encoder failures.

use std::path::{Path, PathBuf};

/// Result alias used throughout the crate.
pub type Result<T, E = RhstError> = std::result::Result<T, E>;

/// Fatal failure while producing an RHST stream.
///
/// `Io`, `BufferOverflow`, `StreamClosed` and `Unflushed` form the I/O failure
/// family; `SchemaViolation` is raised by the encoder for values it cannot represent.
#[derive(Debug, thiserror::Error)]
pub enum RhstError {
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write of {len} bytes at offset {position} exceeds stream capacity of {capacity} bytes")]
    BufferOverflow {
        position: usize,
        len: usize,
        capacity: usize,
    },

    #[error("write to a closed stream")]
    StreamClosed,

    #[error("stream {} was closed without reaching disk", path.display())]
    Unflushed { path: PathBuf },

    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

impl RhstError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::SchemaViolation(message.into())
    }

    /// True for every failure of the backing store (create, size, write, overflow).
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::BufferOverflow { .. }
                | Self::StreamClosed
                | Self::Unflushed { .. }
        )
    }
}
