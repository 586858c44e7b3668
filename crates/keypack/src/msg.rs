//! # Keyed Message
//!
//! `RpcMsg` is the unit a transport moves: a method tag and a flat set of keyed
//! values. Entries are kept sorted by key so encoding is deterministic.

use std::collections::BTreeMap;

use crate::codec::Decoder;
use crate::codec::Encoder;
use crate::Error;
use crate::Kind;
use crate::Result;
use crate::Value;

/// Default size limit of an encoded message (16 MiB).
pub const DEFAULT_LIMIT: usize = 16 * 1024 * 1024;

/// A keyed RPC message.
///
/// Tracks its own encoded size so that writes can be refused before the
/// message outgrows `limit`.
#[derive(Debug, Clone)]
pub struct RpcMsg {
    method: String,
    entries: BTreeMap<String, Value>,
    limit: usize,
    size: usize,
}

impl PartialEq for RpcMsg {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method && self.entries == other.entries
    }
}

impl Eq for RpcMsg {}

fn header_len(method: &str) -> usize {
    1 + 4 + method.len() + 4
}

fn entry_len(key: &str, value: &Value) -> usize {
    1 + 4 + key.len() + value.encoded_len()
}

impl RpcMsg {
    /// Creates an empty message tagged with `method`, using `DEFAULT_LIMIT`.
    pub fn new(method: impl Into<String>) -> Self {
        Self::with_limit(method, DEFAULT_LIMIT)
    }

    /// Creates an empty message whose encoded form may not exceed `limit` bytes.
    pub fn with_limit(method: impl Into<String>, limit: usize) -> Self {
        let method = method.into();
        let size = header_len(&method);
        Self { method, entries: BTreeMap::new(), limit, size }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Size in bytes of `encode()`'s output.
    pub fn encoded_len(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry, keeping the method tag and limit.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.size = header_len(&self.method);
    }

    pub fn key_exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn kind_of(&self, key: &str) -> Option<Kind> {
        self.entries.get(key).map(Value::kind)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Iterates over entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns `Error::BufferTooSmall` if the message would exceed its limit.
    /// The message is left unchanged in that case.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        let released = self.entries.get(&key).map(|old| entry_len(&key, old)).unwrap_or(0);
        let needed = self.size - released + entry_len(&key, &value);
        if needed > self.limit {
            return Err(Error::BufferTooSmall { needed, limit: self.limit });
        }
        self.entries.insert(key, value);
        self.size = needed;
        Ok(())
    }

    pub fn set_word(&mut self, key: impl Into<String>, value: u32) -> Result<()> {
        self.set(key, Value::Word(value))
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.set(key, Value::Str(value.into()))
    }

    pub fn set_word_array(&mut self, key: impl Into<String>, value: &[u32]) -> Result<()> {
        self.set(key, Value::WordArray(value.to_vec()))
    }

    pub fn set_string_array(&mut self, key: impl Into<String>, value: &[String]) -> Result<()> {
        self.set(key, Value::StrArray(value.to_vec()))
    }

    fn missing_or_mismatch(&self, key: &str, expected: Kind) -> Error {
        match self.entries.get(key) {
            Some(value) => Error::TypeMismatch { key: key.to_string(), expected, found: value.kind() },
            None => Error::BadKey(key.to_string()),
        }
    }

    pub fn get_word(&self, key: &str) -> Result<u32> {
        match self.entries.get(key) {
            Some(Value::Word(w)) => Ok(*w),
            _ => Err(self.missing_or_mismatch(key, Kind::Word)),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<&str> {
        match self.entries.get(key) {
            Some(Value::Str(s)) => Ok(s),
            _ => Err(self.missing_or_mismatch(key, Kind::String)),
        }
    }

    pub fn get_word_array(&self, key: &str) -> Result<&[u32]> {
        match self.entries.get(key) {
            Some(Value::WordArray(words)) => Ok(words),
            _ => Err(self.missing_or_mismatch(key, Kind::WordArray)),
        }
    }

    pub fn get_string_array(&self, key: &str) -> Result<&[String]> {
        match self.entries.get(key) {
            Some(Value::StrArray(strings)) => Ok(strings),
            _ => Err(self.missing_or_mismatch(key, Kind::StringArray)),
        }
    }

    /// Encodes the message into its wire form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut enc = Encoder::with_capacity(self.size);
        enc.str(&self.method)?;
        enc.write_u32_raw(self.entries.len() as u32);
        for (key, value) in &self.entries {
            enc.str(key)?;
            enc.value(value)?;
        }
        Ok(enc.into_bytes())
    }

    /// Decodes a message from its wire form.
    ///
    /// The decoded message gets `DEFAULT_LIMIT`, or the input length if larger,
    /// as its limit.
    ///
    /// # Errors
    /// Returns `Error::Corrupt` on duplicate keys or trailing bytes, and the
    /// codec errors (`UnexpectedEnd`, `InvalidTag`, `InvalidUtf8`) otherwise.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut dec = Decoder::new(bytes);
        let method = dec.str()?;
        let count = dec.entry_count()?;

        let mut msg = RpcMsg::with_limit(method, DEFAULT_LIMIT.max(bytes.len()));
        for _ in 0..count {
            let key = dec.str()?;
            let value = dec.value()?;
            if msg.key_exists(key) {
                return Err(Error::Corrupt(format!("duplicate key {}", key)));
            }
            msg.set(key, value)?;
        }

        if dec.remaining() != 0 {
            return Err(Error::Corrupt(format!("{} trailing bytes", dec.remaining())));
        }
        Ok(msg)
    }
}
