//! # TypeRPC
//!
//! Typed remote method calls marshaled over flat `keypack` messages.
//!
//! ## Architecture
//!
//! A method is declared once, as a marker type implementing `Method`. Both
//! sides of the wire are derived from that declaration:
//!
//! - **Call Path**: `Connection::call` writes the arguments under positional
//!   keys `"0"`, `"1"`, ... and reads the result back from key `"0"` of the reply.
//! - **Invoke Path**: `invoke` reads the same keys in the same order, runs the
//!   `Handler`, and writes the result. Any failure, including a panic, becomes
//!   an `"error"` key (plus a best-effort `"backtrace"`) instead of a result.
//!
//! A reply carrying `"error"` surfaces to the caller as `Error::Remote`.
//!
//! ## Transports
//!
//! - `LocalTransport`: in-process, through the codec.
//! - `StreamTransport`: length-prefixed frames over any `Read + Write` stream,
//!   answered by the tokio-based `serve` / `serve_listener`.

mod backtrace;
mod call;
mod error;
mod invoke;
mod local;
mod message;
mod registry;
mod remote;
mod signature;
mod stream;
mod transport;
mod wire;


pub use crate::backtrace::BACKTRACE_DEPTH;
pub use crate::backtrace::capture as capture_backtrace;
pub use crate::call::Connection;
pub use crate::error::Error;
pub use crate::error::Fault;
pub use crate::error::Result;
pub use crate::invoke::FnHandler;
pub use crate::invoke::Handler;
pub use crate::invoke::UNKNOWN_FAILURE;
pub use crate::invoke::invoke;
pub use crate::invoke::invoke_raw;
pub use crate::invoke::write_failure;
pub use crate::local::LocalTransport;
pub use crate::message::MessageReader;
pub use crate::message::MessageWriter;
pub use crate::registry::ModuleManager;
pub use crate::registry::Session;
pub use crate::remote::BACKTRACE_KEY;
pub use crate::remote::ERROR_KEY;
pub use crate::remote::RemoteError;
pub use crate::signature::ArgList;
pub use crate::signature::Method;
pub use crate::signature::Signature;
pub use crate::signature::method_tag;
pub use crate::stream::StreamConfig;
pub use crate::stream::StreamTransport;
pub use crate::stream::serve;
pub use crate::stream::serve_listener;
pub use crate::transport::Transport;
pub use crate::transport::TransportError;
pub use crate::wire::Wire;

pub use keypack::Kind;
pub use keypack::RpcMsg;
