//! # Remote Errors
//!
//! The caller-side view of a failure reported by the responder.

use keypack::RpcMsg;

/// Reserved reply key carrying the failure message.
pub const ERROR_KEY: &str = "error";

/// Reserved reply key carrying the responder's call stack, one frame per entry.
pub const BACKTRACE_KEY: &str = "backtrace";

/// A failure reported by the responder in place of a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    message: String,
    backtrace: Option<Vec<String>>,
}

impl RemoteError {
    /// Builds the error carried by `reply`, or `None` if the reply has no `"error"` key.
    ///
    /// A `"backtrace"` key of the wrong kind is treated as absent. An `"error"` key
    /// of the wrong kind still yields an error, described by the type mismatch.
    pub fn from_reply(reply: &RpcMsg) -> Option<Self> {
        if !reply.key_exists(ERROR_KEY) {
            return None;
        }
        let message = match reply.get_string(ERROR_KEY) {
            Ok(message) => message.to_string(),
            Err(e) => format!("malformed error reply: {}", e),
        };
        let backtrace = reply.get_string_array(BACKTRACE_KEY).ok().map(<[String]>::to_vec);
        Some(Self { message, backtrace })
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn has_backtrace(&self) -> bool {
        self.backtrace.is_some()
    }

    pub fn backtrace(&self) -> Option<&[String]> {
        self.backtrace.as_deref()
    }

    /// The backtrace as printable text, one frame per line.
    pub fn backtrace_text(&self) -> String {
        match &self.backtrace {
            Some(frames) => frames.join("\n"),
            None => "no backtrace available".to_string(),
        }
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "remote error: {}", self.message)
    }
}

impl std::error::Error for RemoteError {}
