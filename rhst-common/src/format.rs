//! RHST wire format constants
//!
//! # Layout
//! ```text
//! header:   "RHST" (4 bytes) ; i32 version = 1
//! body:     one DICT ... END_DICT value
//! trailer:  i32 NULL = 0
//! ```
//!
//! Every record starts with an i32 tag. Per-tag payloads:
//! ```text
//! NULL        -
//! DICT        i32 child_count ; i32 name_len ; name bytes ; pad to 4
//! END_DICT    -
//! ARRAY       i32 length ; i32 element_tag (always 0) ; elements ; END_ARRAY
//! END_ARRAY   -
//! STRING      i32 len ; bytes ; pad to 4
//! S32         i32 value
//! F32         f32 value
//! ```
//! All integers and floats are little-endian.

/// Stream magic.
pub const RHST_MAGIC: [u8; 4] = *b"RHST";

/// The single supported format version, written as a bare i32 after the magic.
pub const RHST_VERSION: i32 = 1;

/// Default stream capacity (100 MB), the size of the export's backing store.
pub const DEFAULT_CAPACITY: usize = 100 * 1000 * 1000;

/// Alignment applied after every variable-length name or string payload.
pub const STRING_ALIGNMENT: usize = 4;

/// Element tag written in every ARRAY record; arrays are heterogeneous.
pub const ARRAY_ELEMENT_ANY: i32 = 0;

/// Record tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RhstTag {
    Null = 0,
    Dict = 1,
    Array = 2,
    /// Reserved by the format; never written by the encoder.
    ArrayDynamic = 3,
    EndDict = 4,
    EndArray = 5,
    EndArrayDynamic = 6,
    String = 7,
    S32 = 8,
    F32 = 9,
}

impl RhstTag {
    /// Raw tag value as written on the wire.
    pub const fn raw(self) -> i32 {
        self as i32
    }

    /// Parse a raw tag value.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Self::Null,
            1 => Self::Dict,
            2 => Self::Array,
            3 => Self::ArrayDynamic,
            4 => Self::EndDict,
            5 => Self::EndArray,
            6 => Self::EndArrayDynamic,
            7 => Self::String,
            8 => Self::S32,
            9 => Self::F32,
            _ => return None,
        })
    }
}
