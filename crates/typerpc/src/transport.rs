//! # Transport Abstraction
//!
//! A minimal, blocking interface for delivering a request message to the
//! responder and handing back its reply.
//!
//! ## Philosophy
//!
//! - **Message-Oriented**: The transport moves whole `RpcMsg`s. It never looks
//!   at positional keys, and it passes `"error"` replies through untouched.
//! - **Sessions**: Modules are loaded per connection. Calling into a module the
//!   connection has not loaded is refused by the transport, not the method.
//! - **Blocking**: One outstanding request per connection. No pipelining.

use std::fmt;
use std::io;

use keypack::RpcMsg;

/// Errors raised while moving messages, before any method runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer is unreachable or the connection was dropped.
    ConnectionLost(String),
    /// No module of that name is registered with the responder.
    UnknownModule(String),
    /// The module exists but answers to another version key.
    VersionMismatch { module: String, expected: String, found: String },
    /// The request targets a module this connection never loaded.
    ModuleNotLoaded(String),
    /// No method with that tag is registered.
    UnknownMethod(String),
    /// A frame header announced more bytes than the configured maximum.
    FrameTooLarge { len: usize, max: usize },
    /// The request or reply bytes did not form a valid message.
    Codec(keypack::Error),
    /// The reply answers a different method than the request named.
    ReplyMismatch { expected: String, found: String },
    /// The peer refused the frame for a reason without a dedicated variant.
    Refused(String),
    /// Generic I/O error.
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::UnknownModule(module) => write!(f, "Unknown module: {}", module),
            Self::VersionMismatch { module, expected, found } => {
                write!(f, "Version mismatch for module {}: expected '{}', found '{}'", module, expected, found)
            }
            Self::ModuleNotLoaded(module) => write!(f, "Module not loaded: {}", module),
            Self::UnknownMethod(tag) => write!(f, "Unknown method: {}", tag),
            Self::FrameTooLarge { len, max } => write!(f, "Frame of {} bytes exceeds maximum of {}", len, max),
            Self::Codec(e) => write!(f, "Codec error: {}", e),
            Self::ReplyMismatch { expected, found } => {
                write!(f, "Reply for '{}' received while calling '{}'", found, expected)
            }
            Self::Refused(reason) => write!(f, "Refused by peer: {}", reason),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<keypack::Error> for TransportError {
    fn from(e: keypack::Error) -> Self {
        Self::Codec(e)
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => Self::ConnectionLost(e.to_string()),
            _ => Self::Io(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// A connection to a responder.
pub trait Transport {
    /// Loads `module` on this connection, checking that the responder serves
    /// the exact `version_key`.
    fn load_module(&mut self, module: &str, version_key: &str) -> Result<()>;

    /// Delivers `request` and blocks until the reply arrives.
    ///
    /// # Invariants
    /// - A reply carrying an `"error"` key is still `Ok`.
    /// - The reply's method tag matches the request's.
    fn send_and_receive(&mut self, request: RpcMsg) -> Result<RpcMsg>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn load_module(&mut self, module: &str, version_key: &str) -> Result<()> {
        (**self).load_module(module, version_key)
    }

    fn send_and_receive(&mut self, request: RpcMsg) -> Result<RpcMsg> {
        (**self).send_and_receive(request)
    }
}
