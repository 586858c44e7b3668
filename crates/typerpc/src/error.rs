//! # Error Definitions
//!
//! The failures a caller can observe from the Call Path.

use crate::remote::RemoteError;
use crate::transport::TransportError;

/// A failure raised by a method implementation on the responder side.
///
/// Its `Display` text becomes the `"error"` key of the reply, verbatim.
pub type Fault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures of a typed call.
#[derive(Debug, Clone)]
pub enum Error {
    /// A message did not hold the expected keys (missing, mistyped, or over its limit).
    Message(keypack::Error),
    /// The transport failed to deliver the request or the reply.
    Transport(TransportError),
    /// The responder reported a failure.
    Remote(RemoteError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(e) => write!(f, "Message error: {}", e),
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Remote(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Message(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::Remote(e) => Some(e),
        }
    }
}

impl From<keypack::Error> for Error {
    fn from(e: keypack::Error) -> Self {
        Self::Message(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

/// A specialized Result type for typed calls.
pub type Result<T> = std::result::Result<T, Error>;
