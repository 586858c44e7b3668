//! # Keypack
//!
//! A small, bounded, keyed message format for RPC payloads.
//!
//! ## Philosophy
//!
//! - **Flat**: A message is a method tag plus a set of string keys. No nesting.
//! - **Four Kinds**: Every key holds exactly one of a word (`u32`), a UTF-8
//!   string, a word array, or a string array.
//! - **Checked Reads**: Reading a key that is absent or holds another kind is
//!   an `Error`, never a panic.
//! - **Bounded**: Every message carries a size limit. Writes that would grow the
//!   encoded form past it are refused.
//!
//! ## Format
//!
//! - **Message**: `[Method: blob][Count: 4b]` followed by `Count` entries.
//! - **Entry**: `[Key: blob][Value]`
//! - **Blobs**: `[Tag: 1b][Len: 4b][Data: Len]`
//! - **Word**: `[Tag: 1b][Data: 4b]`
//! - **Arrays**: `[Tag: 1b][Count: 4b][Items]`
//!
//! All integers are Little-Endian.

mod codec;
mod msg;

#[cfg(test)]
mod tests;

pub use crate::codec::Tag;
pub use crate::msg::RpcMsg;
pub use crate::msg::DEFAULT_LIMIT;

/// Keypack errors, for both keyed access and the binary codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The requested key is not present in the message.
    BadKey(String),
    /// The key is present but holds a value of another kind.
    TypeMismatch { key: String, expected: Kind, found: Kind },
    /// Writing the value would grow the message past its limit.
    BufferTooSmall { needed: usize, limit: usize },
    /// Buffer exhausted while reading.
    UnexpectedEnd,
    /// Byte does not correspond to a valid `Tag`.
    InvalidTag(u8),
    /// String data is not valid UTF-8.
    InvalidUtf8,
    /// Blob or array length exceeds `u32::MAX`.
    BlobTooLarge(usize),
    /// The bytes parse but do not form a valid message.
    Corrupt(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BadKey(key) => write!(f, "bad RPC key {}", key),
            Error::TypeMismatch { key, expected, found } => {
                write!(f, "RPC type error: key {} holds {}, expected {}", key, found, expected)
            }
            Error::BufferTooSmall { needed, limit } => {
                write!(f, "RPC buffer too small: {} bytes needed, limit is {}", needed, limit)
            }
            Error::UnexpectedEnd => write!(f, "corrupt RPC message: unexpected end of buffer"),
            Error::InvalidTag(b) => write!(f, "corrupt RPC message: invalid tag byte {:#04x}", b),
            Error::InvalidUtf8 => write!(f, "corrupt RPC message: invalid UTF-8"),
            Error::BlobTooLarge(len) => write!(f, "RPC blob too large: {} bytes", len),
            Error::Corrupt(reason) => write!(f, "corrupt RPC message: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for Keypack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of value held under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Word,
    String,
    WordArray,
    StringArray,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Kind::Word => "word",
            Kind::String => "string",
            Kind::WordArray => "word-array",
            Kind::StringArray => "string-array",
        })
    }
}

/// A value stored under one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Word(u32),
    Str(String),
    WordArray(Vec<u32>),
    StrArray(Vec<String>),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Word(_) => Kind::Word,
            Value::Str(_) => Kind::String,
            Value::WordArray(_) => Kind::WordArray,
            Value::StrArray(_) => Kind::StringArray,
        }
    }

    /// Number of bytes this value occupies on the wire, tag included.
    pub fn encoded_len(&self) -> usize {
        match self {
            Value::Word(_) => 1 + 4,
            Value::Str(s) => 1 + 4 + s.len(),
            Value::WordArray(words) => 1 + 4 + 4 * words.len(),
            Value::StrArray(strings) => 1 + 4 + strings.iter().map(|s| 1 + 4 + s.len()).sum::<usize>(),
        }
    }
}
