//! # Codec
//!
//! Byte-level encoder and decoder for keyed messages.
//!
//! ## Invariants
//! - **Panic Safety**: All decoding paths return `Result`, never panicking on hostile input.
//! - **Symmetry**: `Decoder::value` accepts exactly what `Encoder::value` produces.

use crate::Error;
use crate::Result;
use crate::Value;

/// Identifies the type of the encoded item.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Unsigned 32-bit word (LE).
    Word = 0x05,
    /// UTF-8 string blob (Tag + u32 Len + Bytes).
    String = 0x10,
    /// Word array (Tag + u32 Count + Count * 4 bytes).
    WordArray = 0x24,
    /// String array (Tag + u32 Count + Count string blobs).
    StringArray = 0x25,
}

impl Tag {
    /// Returns the Tag variant for a given byte, or `None` if invalid.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x05 => Some(Tag::Word),
            0x10 => Some(Tag::String),
            0x24 => Some(Tag::WordArray),
            0x25 => Some(Tag::StringArray),
            _ => None,
        }
    }
}

/// Growable output buffer.
pub(crate) struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self { buf: Vec::with_capacity(cap) }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_tag(&mut self, tag: Tag) {
        self.buf.push(tag as u8);
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        if len > u32::MAX as usize {
            return Err(Error::BlobTooLarge(len));
        }
        self.write_u32_raw(len as u32);
        Ok(())
    }

    pub(crate) fn write_u32_raw(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Encodes a UTF-8 string blob.
    pub(crate) fn str(&mut self, v: &str) -> Result<()> {
        self.write_tag(Tag::String);
        self.write_len(v.len())?;
        self.buf.extend_from_slice(v.as_bytes());
        Ok(())
    }

    /// Encodes one tagged value.
    pub(crate) fn value(&mut self, v: &Value) -> Result<()> {
        match v {
            Value::Word(w) => {
                self.write_tag(Tag::Word);
                self.write_u32_raw(*w);
            }
            Value::Str(s) => self.str(s)?,
            Value::WordArray(words) => {
                self.write_tag(Tag::WordArray);
                self.write_len(words.len())?;
                for w in words {
                    self.write_u32_raw(*w);
                }
            }
            Value::StrArray(strings) => {
                self.write_tag(Tag::StringArray);
                self.write_len(strings.len())?;
                for s in strings {
                    self.str(s)?;
                }
            }
        }
        Ok(())
    }
}

/// A zero-copy, bounds-checked cursor over a byte slice.
///
/// # Errors
/// All read operations return `Error::UnexpectedEnd` if the buffer is exhausted.
#[derive(Debug, Clone)]
pub(crate) struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn read_tag(&mut self) -> Result<Tag> {
        let b = self.read_bytes(1)?[0];
        Tag::from_u8(b).ok_or(Error::InvalidTag(b))
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() {
            return Err(Error::UnexpectedEnd);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub(crate) fn read_u32_raw(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a count and checks that `count * min_item` bytes can still follow.
    ///
    /// Keeps a corrupt header from driving a huge allocation.
    fn read_count(&mut self, min_item: usize) -> Result<usize> {
        let count = self.read_u32_raw()? as usize;
        if count.saturating_mul(min_item) > self.buf.len() {
            return Err(Error::UnexpectedEnd);
        }
        Ok(count)
    }

    fn str_body(&mut self) -> Result<&'a str> {
        let len = self.read_u32_raw()? as usize;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
    }

    /// Decodes a string blob.
    pub(crate) fn str(&mut self) -> Result<&'a str> {
        match self.read_tag()? {
            Tag::String => self.str_body(),
            other => Err(Error::InvalidTag(other as u8)),
        }
    }

    /// Decodes one tagged value.
    pub(crate) fn value(&mut self) -> Result<Value> {
        match self.read_tag()? {
            Tag::Word => Ok(Value::Word(self.read_u32_raw()?)),
            Tag::String => Ok(Value::Str(self.str_body()?.to_string())),
            Tag::WordArray => {
                let count = self.read_count(4)?;
                let mut words = Vec::with_capacity(count);
                for _ in 0..count {
                    words.push(self.read_u32_raw()?);
                }
                Ok(Value::WordArray(words))
            }
            Tag::StringArray => {
                let count = self.read_count(1 + 4)?;
                let mut strings = Vec::with_capacity(count);
                for _ in 0..count {
                    strings.push(self.str()?.to_string());
                }
                Ok(Value::StrArray(strings))
            }
        }
    }

    pub(crate) fn entry_count(&mut self) -> Result<usize> {
        // smallest entry: empty key blob + word
        self.read_count(1 + 4 + 1 + 4)
    }
}
