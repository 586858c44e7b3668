//! # Positional Messages
//!
//! Typed views over an `RpcMsg` whose keys are implicit positions: the n-th
//! value written lands under key `"n"`, and the n-th value read comes from it.
//!
//! ## Invariants
//! - **Direction**: A `MessageWriter` only writes and a `MessageReader` only reads.
//!   The two never share a message at the same time.
//! - **Order**: Values must be read in exactly the order they were written.
//!   Each view starts its cursor at 0.

use keypack::Result;
use keypack::RpcMsg;
use keypack::Value;

use crate::signature::ArgList;
use crate::wire::Wire;

/// A write-bound view over a fresh message.
pub struct MessageWriter<'a> {
    msg: &'a mut RpcMsg,
    next_key: u32,
}

impl<'a> MessageWriter<'a> {
    pub fn new(msg: &'a mut RpcMsg) -> Self {
        Self { msg, next_key: 0 }
    }

    /// The key the next value will be written under.
    pub fn next_key(&self) -> u32 {
        self.next_key
    }

    /// Writes one value at the cursor.
    pub fn write<T: Wire>(&mut self, value: &T) -> Result<()> {
        value.write(self)
    }

    /// Writes every element of an argument tuple, left to right.
    pub fn write_args<A: ArgList>(&mut self, args: &A) -> Result<()> {
        args.write_all(self)
    }

    /// Stores `value` under the cursor key and advances the cursor.
    ///
    /// The building block for `Wire` implementations.
    pub fn push(&mut self, value: Value) -> Result<()> {
        self.msg.set(self.next_key.to_string(), value)?;
        self.next_key += 1;
        Ok(())
    }
}

/// A read-bound view over a populated message.
pub struct MessageReader<'a> {
    msg: &'a RpcMsg,
    next_key: u32,
}

impl<'a> MessageReader<'a> {
    pub fn new(msg: &'a RpcMsg) -> Self {
        Self { msg, next_key: 0 }
    }

    /// The key the next value will be read from.
    pub fn next_key(&self) -> u32 {
        self.next_key
    }

    /// Reads one value at the cursor.
    pub fn read<T: Wire>(&mut self) -> Result<T> {
        T::read(self)
    }

    /// Reads an argument tuple, left to right.
    pub fn read_args<A: ArgList>(&mut self) -> Result<A> {
        A::read_all(self)
    }

    /// Fetches the cursor key with `get` and advances the cursor on success.
    ///
    /// The building block for `Wire` implementations.
    pub fn take<T>(&mut self, get: impl FnOnce(&'a RpcMsg, &str) -> Result<T>) -> Result<T> {
        let value = get(self.msg, &self.next_key.to_string())?;
        self.next_key += 1;
        Ok(value)
    }
}
