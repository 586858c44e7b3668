//! # Method Signatures
//!
//! A method is a zero-sized marker type naming an operation and fixing its
//! argument and result types at compile time.
//!
//! ```ignore
//! struct Read;
//!
//! impl Method for Read {
//!     const MODULE: &'static str = "memory";
//!     const NAME: &'static str = "Read";
//!     type Args = (u32, u32);
//!     type Output = Vec<u32>;
//! }
//! ```
//!
//! The wire tag is `"{MODULE}.{NAME}"`, spelled out by the declaration itself and
//! therefore identical across builds and toolchains.

use std::fmt;

use keypack::Kind;
use keypack::Result;

use crate::message::MessageReader;
use crate::message::MessageWriter;
use crate::wire::Wire;

/// A typed remote operation.
pub trait Method: 'static {
    /// The module that owns the operation. Must not contain `'.'`.
    const MODULE: &'static str;
    /// The operation name within its module.
    const NAME: &'static str;
    /// Argument types, in positional order.
    type Args: ArgList;
    /// Result type; `()` for operations that return nothing.
    type Output: Wire;
}

/// The wire tag of a method: `"{MODULE}.{NAME}"`.
pub fn method_tag<M: Method>() -> String {
    format!("{}.{}", M::MODULE, M::NAME)
}

/// An ordered list of wire values, implemented for tuples of up to eight `Wire` types.
pub trait ArgList: Sized {
    const ARITY: usize;

    /// The kinds of the keys the list occupies, in order.
    fn kinds() -> Vec<Kind>;

    fn write_all(&self, msg: &mut MessageWriter<'_>) -> Result<()>;

    fn read_all(msg: &mut MessageReader<'_>) -> Result<Self>;
}

macro_rules! impl_arg_list {
    (@count) => { 0usize };
    (@count $head:ident $($tail:ident)*) => { 1usize + impl_arg_list!(@count $($tail)*) };
    ($($name:ident),*) => {
        impl<$($name: Wire),*> ArgList for ($($name,)*) {
            const ARITY: usize = impl_arg_list!(@count $($name)*);

            #[allow(unused_mut)]
            fn kinds() -> Vec<Kind> {
                let mut kinds = Vec::new();
                $( kinds.extend($name::KIND); )*
                kinds
            }

            #[allow(non_snake_case, unused_variables)]
            fn write_all(&self, msg: &mut MessageWriter<'_>) -> Result<()> {
                let ($($name,)*) = self;
                $( msg.write($name)?; )*
                Ok(())
            }

            #[allow(unused_variables)]
            fn read_all(msg: &mut MessageReader<'_>) -> Result<Self> {
                Ok(($( msg.read::<$name>()?, )*))
            }
        }
    };
}

impl_arg_list!();
impl_arg_list!(A);
impl_arg_list!(A, B);
impl_arg_list!(A, B, C);
impl_arg_list!(A, B, C, D);
impl_arg_list!(A, B, C, D, E);
impl_arg_list!(A, B, C, D, E, F);
impl_arg_list!(A, B, C, D, E, F, G);
impl_arg_list!(A, B, C, D, E, F, G, H);

/// A runtime description of a method, used for registry listings and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub module: &'static str,
    pub name: &'static str,
    pub args: Vec<Kind>,
    pub output: Option<Kind>,
}

impl Signature {
    pub fn of<M: Method>() -> Self {
        Self {
            module: M::MODULE,
            name: M::NAME,
            args: <M::Args as ArgList>::kinds(),
            output: <M::Output as Wire>::KIND,
        }
    }

    pub fn tag(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.module, self.name)?;
        for (i, kind) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", kind)?;
        }
        match self.output {
            Some(kind) => write!(f, ") -> {}", kind),
            None => write!(f, ") -> ()"),
        }
    }
}
