//! rhst-export library
//!
//! Flattens a 3D scene into an RHST intermediate stream: one root bone, a
//! deduplicated material list, one polygon per exported material slot and an
//! ordered draw list. Scene sources plug in through
//! [`scene::MeshInstanceProvider`].

pub mod error;
pub mod export;
pub mod flatten;
pub mod model;
pub mod options;
pub mod scene;

pub use error::{ExportError, GeometryError};
pub use export::{build_document, export_document, export_scene, ExportReport};
pub use flatten::{Diagnostic, SceneFlattener};
pub use model::{Body, Document, ModelBuilder};
pub use options::{ExportOptions, Srt};
pub use scene::{GltfScene, MemoryInstance, MemoryScene, MeshInstanceProvider};

// Re-export the stream format for callers writing their own documents
pub use rhst_common::{Dict, Value};
