//! Minimal RHST reader for tests
//!
//! Decodes streams produced by the encoder back into a `Value` tree, undoing
//! the per-entry wrapper dictionaries.

#![allow(dead_code)]

use rhst_common::format::{RHST_MAGIC, RHST_VERSION, RhstTag};
use rhst_common::{Dict, Value};

pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

/// Decoded document: the root dictionary's two children.
pub struct Document {
    pub head: Dict,
    pub body: Dict,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    fn read_i32(&mut self) -> i32 {
        let bytes: [u8; 4] = self.data[self.pos..self.pos + 4]
            .try_into()
            .expect("truncated stream");
        self.pos += 4;
        i32::from_le_bytes(bytes)
    }

    fn read_f32(&mut self) -> f32 {
        f32::from_bits(self.read_i32() as u32)
    }

    fn read_tag(&mut self) -> RhstTag {
        let raw = self.read_i32();
        RhstTag::from_raw(raw).unwrap_or_else(|| panic!("unknown tag {} at {}", raw, self.pos - 4))
    }

    fn expect_tag(&mut self, expected: RhstTag) {
        let tag = self.read_tag();
        assert_eq!(tag, expected, "unexpected tag at {}", self.pos - 4);
    }

    fn read_inline_string(&mut self) -> String {
        let len = self.read_i32() as usize;
        let text = std::str::from_utf8(&self.data[self.pos..self.pos + len])
            .expect("invalid utf-8")
            .to_owned();
        self.pos += len.next_multiple_of(4);
        text
    }

    /// Decode one value.
    pub fn read_value(&mut self) -> Value {
        match self.read_tag() {
            RhstTag::S32 => Value::Int(i64::from(self.read_i32())),
            RhstTag::F32 => Value::Float(self.read_f32()),
            RhstTag::String => Value::String(self.read_inline_string()),
            RhstTag::Array => {
                let len = self.read_i32() as usize;
                let element_tag = self.read_i32();
                assert_eq!(element_tag, 0, "array element tag");
                let items = (0..len).map(|_| self.read_value()).collect();
                self.expect_tag(RhstTag::EndArray);
                Value::Array(items)
            }
            RhstTag::Dict => {
                let count = self.read_i32() as usize;
                let name = self.read_inline_string();
                let dict = self.read_dict_entries(count);
                assert_eq!(
                    dict.name().and_then(Value::as_str),
                    Some(name.as_str()),
                    "dictionary header name differs from its name entry"
                );
                Value::Dict(dict)
            }
            tag => panic!("unexpected {:?} at {}", tag, self.pos - 4),
        }
    }

    fn read_dict_entries(&mut self, count: usize) -> Dict {
        let mut dict = Dict::new();
        for _ in 0..count {
            self.expect_tag(RhstTag::Dict);
            assert_eq!(self.read_i32(), 1, "wrapper dictionaries hold one child");
            let key = self.read_inline_string();
            let value = self.read_value();
            self.expect_tag(RhstTag::EndDict);
            dict.insert(key, value);
        }
        self.expect_tag(RhstTag::EndDict);
        dict
    }

    /// Decode a complete document: header, `root { head, body }`, trailer.
    pub fn read_document(&mut self) -> Document {
        assert_eq!(&self.data[..4], &RHST_MAGIC, "magic");
        self.pos = 4;
        assert_eq!(self.read_i32(), RHST_VERSION, "version");

        self.expect_tag(RhstTag::Dict);
        assert_eq!(self.read_i32(), 2, "root child count");
        assert_eq!(self.read_inline_string(), "root");

        let head = match self.read_value() {
            Value::Dict(d) => d,
            other => panic!("head is not a dict: {:?}", other),
        };
        let body = match self.read_value() {
            Value::Dict(d) => d,
            other => panic!("body is not a dict: {:?}", other),
        };
        self.expect_tag(RhstTag::EndDict);
        self.expect_tag(RhstTag::Null);
        assert!(self.is_at_end(), "trailing bytes after NULL");

        Document { head, body }
    }
}
