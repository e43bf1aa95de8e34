//! Recursive RHST tree encoder
//!
//! Dispatch is by [`Value`] variant:
//! - `Float` → `F32`
//! - `Int` / `Bool` → `S32` (bools as 0/1)
//! - `String` → `STRING`, padded to 4 bytes
//! - `Array` → `ARRAY(len, 0)`, elements, `END_ARRAY`
//! - `Dict` → `DICT(name, entry_count)`, then one `DICT(key, 1) value END_DICT`
//!   wrapper per entry, then `END_DICT`
//! - `Null` → schema violation
//!
//! The per-entry wrapper dictionary is part of the format: the consumer reads
//! each key as a one-child dictionary.

use crate::error::{Result, RhstError};
use crate::format::{ARRAY_ELEMENT_ANY, RHST_MAGIC, RHST_VERSION, RhstTag, STRING_ALIGNMENT};
use crate::stream::StreamWriter;
use crate::value::{Dict, Value};

/// Name of the dictionary framing the head and body of a document.
pub const ROOT_NAME: &str = "root";

/// The root dictionary always holds exactly the head and the body.
pub const ROOT_CHILD_COUNT: usize = 2;

/// Tagged encoder writing into a [`StreamWriter`].
pub struct TreeEncoder<'a> {
    stream: &'a mut StreamWriter,
}

impl<'a> TreeEncoder<'a> {
    pub fn new(stream: &'a mut StreamWriter) -> Self {
        Self { stream }
    }

    pub fn position(&self) -> usize {
        self.stream.tell()
    }

    /// Magic and bare version word.
    pub fn write_header(&mut self) -> Result<()> {
        self.stream.write_bytes(&RHST_MAGIC)?;
        self.stream.write_i32(RHST_VERSION)
    }

    /// Terminating NULL tag.
    pub fn write_trailer(&mut self) -> Result<()> {
        self.write_tag(RhstTag::Null)
    }

    /// Header followed by the opening of the root dictionary.
    pub fn begin_document(&mut self) -> Result<()> {
        self.write_header()?;
        self.begin_dict(ROOT_NAME, ROOT_CHILD_COUNT)
    }

    /// Closes the root dictionary and writes the trailer.
    pub fn end_document(&mut self) -> Result<()> {
        self.end_dict()?;
        self.write_trailer()
    }

    /// Encode a complete document: `root { head, body }`.
    pub fn write_document(&mut self, head: &Value, body: &Value) -> Result<()> {
        self.begin_document()?;
        self.encode(head)?;
        self.encode(body)?;
        self.end_document()
    }

    /// Encode one value and everything below it.
    pub fn encode(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Float(v) => self.write_f32(*v),
            Value::Int(v) => {
                let v = i32::try_from(*v).map_err(|_| {
                    RhstError::schema(format!("integer {} does not fit in an S32 record", v))
                })?;
                self.write_s32(v)
            }
            Value::Bool(b) => self.write_s32(i32::from(*b)),
            Value::String(s) => self.write_string(s),
            Value::Array(items) => {
                self.begin_array(items.len())?;
                for item in items {
                    self.encode(item)?;
                }
                self.end_array()
            }
            Value::Dict(dict) => self.encode_dict(dict),
            Value::Null => Err(RhstError::schema("null values cannot be encoded")),
        }
    }

    fn encode_dict(&mut self, dict: &Dict) -> Result<()> {
        let name = match dict.name() {
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(RhstError::schema(format!(
                    "dictionary `name` must be a string, found {}",
                    other.kind()
                )));
            }
            None => {
                let keys: Vec<_> = dict.keys().collect();
                return Err(RhstError::schema(format!(
                    "dictionary without a `name` entry (keys: {:?})",
                    keys
                )));
            }
        };

        self.begin_dict(name, dict.len())?;
        for (key, value) in dict.iter() {
            self.begin_dict(key, 1)?;
            self.encode(value)?;
            self.end_dict()?;
        }
        self.end_dict()
    }

    pub fn write_s32(&mut self, value: i32) -> Result<()> {
        self.write_tag(RhstTag::S32)?;
        self.stream.write_i32(value)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_tag(RhstTag::F32)?;
        self.stream.write_f32(value)
    }

    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_tag(RhstTag::String)?;
        self.write_inline_string(value)
    }

    pub fn begin_dict(&mut self, name: &str, child_count: usize) -> Result<()> {
        self.write_tag(RhstTag::Dict)?;
        self.stream.write_i32(wire_count(child_count, "dictionary")?)?;
        self.write_inline_string(name)
    }

    pub fn end_dict(&mut self) -> Result<()> {
        self.write_tag(RhstTag::EndDict)
    }

    pub fn begin_array(&mut self, len: usize) -> Result<()> {
        self.write_tag(RhstTag::Array)?;
        self.stream.write_i32(wire_count(len, "array")?)?;
        self.stream.write_i32(ARRAY_ELEMENT_ANY)
    }

    pub fn end_array(&mut self) -> Result<()> {
        self.write_tag(RhstTag::EndArray)
    }

    fn write_tag(&mut self, tag: RhstTag) -> Result<()> {
        self.stream.write_i32(tag.raw())
    }

    /// Length-prefixed bytes, padded to the string alignment.
    fn write_inline_string(&mut self, value: &str) -> Result<()> {
        self.stream
            .write_i32(wire_count(value.len(), "string")?)?;
        self.stream.write_bytes(value.as_bytes())?;
        self.stream.align(STRING_ALIGNMENT)
    }
}

fn wire_count(len: usize, what: &str) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| RhstError::schema(format!("{} length {} exceeds i32 range", what, len)))
}
