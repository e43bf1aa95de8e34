//! Error types for scene export

use std::path::PathBuf;

use rhst_common::RhstError;

/// Failure to produce triangulated geometry for one mesh instance.
///
/// Recoverable: the instance is skipped and the export continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("triangulation failed: {0}")]
    Triangulation(String),

    #[error("mesh has no vertex positions")]
    MissingPositions,

    #[error("unsupported primitive topology: {0}")]
    UnsupportedTopology(String),

    #[error("vertex index {index} out of range ({count} vertices)")]
    IndexOutOfRange { index: u32, count: usize },

    #[error("{channel} layer {layer} has {found} corners, expected {expected}")]
    ChannelLength {
        channel: &'static str,
        layer: usize,
        found: usize,
        expected: usize,
    },
}

/// Fatal export failure. The destination file must be treated as invalid.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Stream(#[from] RhstError),

    #[error("failed to load scene {}: {source}", path.display())]
    SceneLoad {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("scene file {} defines no scene", path.display())]
    EmptyScene { path: PathBuf },
}

impl ExportError {
    /// Backing store could not be created, sized or written.
    pub fn is_io_failure(&self) -> bool {
        matches!(self, Self::Stream(e) if e.is_io_failure())
    }

    /// The document contained a value the encoder cannot represent.
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, Self::Stream(RhstError::SchemaViolation(_)))
    }
}
