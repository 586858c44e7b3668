//! # Wire Types
//!
//! One `Wire` implementation per type that may cross the wire. Each occupies
//! exactly one positional key, except `()`, which occupies none.
//!
//! A type without an implementation cannot appear in a method signature.

use keypack::Kind;
use keypack::Result;
use keypack::Value;

use crate::message::MessageReader;
use crate::message::MessageWriter;

/// A value that can be written to, and read back from, one positional key.
pub trait Wire: Sized {
    /// The kind of key this type occupies, or `None` if it occupies no key.
    const KIND: Option<Kind>;

    fn write(&self, msg: &mut MessageWriter<'_>) -> Result<()>;

    fn read(msg: &mut MessageReader<'_>) -> Result<Self>;
}

impl Wire for u32 {
    const KIND: Option<Kind> = Some(Kind::Word);

    fn write(&self, msg: &mut MessageWriter<'_>) -> Result<()> {
        msg.push(Value::Word(*self))
    }

    fn read(msg: &mut MessageReader<'_>) -> Result<Self> {
        msg.take(|m, key| m.get_word(key))
    }
}

impl Wire for String {
    const KIND: Option<Kind> = Some(Kind::String);

    fn write(&self, msg: &mut MessageWriter<'_>) -> Result<()> {
        msg.push(Value::Str(self.clone()))
    }

    fn read(msg: &mut MessageReader<'_>) -> Result<Self> {
        msg.take(|m, key| m.get_string(key).map(str::to_owned))
    }
}

impl Wire for Vec<u32> {
    const KIND: Option<Kind> = Some(Kind::WordArray);

    fn write(&self, msg: &mut MessageWriter<'_>) -> Result<()> {
        msg.push(Value::WordArray(self.clone()))
    }

    fn read(msg: &mut MessageReader<'_>) -> Result<Self> {
        msg.take(|m, key| m.get_word_array(key).map(<[u32]>::to_vec))
    }
}

impl Wire for Vec<String> {
    const KIND: Option<Kind> = Some(Kind::StringArray);

    fn write(&self, msg: &mut MessageWriter<'_>) -> Result<()> {
        msg.push(Value::StrArray(self.clone()))
    }

    fn read(msg: &mut MessageReader<'_>) -> Result<Self> {
        msg.take(|m, key| m.get_string_array(key).map(<[String]>::to_vec))
    }
}

/// The return type of methods that produce nothing.
impl Wire for () {
    const KIND: Option<Kind> = None;

    fn write(&self, _msg: &mut MessageWriter<'_>) -> Result<()> {
        Ok(())
    }

    fn read(_msg: &mut MessageReader<'_>) -> Result<Self> {
        Ok(())
    }
}
