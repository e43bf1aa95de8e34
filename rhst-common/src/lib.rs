//! RHST stream format shared by the scene exporter
//!
//! RHST (Rii Hierarchical Scene Tree) is a tagged little-endian binary stream
//! that carries arbitrarily nested dictionaries, arrays, strings and scalars
//! without a fixed schema. The downstream model converter consumes it.
//!
//! # Modules
//!
//! - [`format`] - Wire tags, magic and version constants
//! - [`stream`] - Fixed-capacity, position-tracked output stream
//! - [`registry`] - Owner of every stream opened during one export
//! - [`value`] - Encodable value tree
//! - [`encoder`] - Recursive tree encoder and document framing

pub mod encoder;
pub mod error;
pub mod format;
pub mod registry;
pub mod stream;
pub mod value;

pub use encoder::TreeEncoder;
pub use error::{Result, RhstError};
pub use format::{DEFAULT_CAPACITY, RHST_MAGIC, RHST_VERSION, RhstTag};
pub use registry::{WriterId, WriterRegistry};
pub use stream::StreamWriter;
pub use value::{Dict, Value};
