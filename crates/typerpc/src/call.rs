//! # Call Path
//!
//! The caller's side: marshal typed arguments, ship the request, and turn the
//! reply back into a typed result or a `RemoteError`.

use keypack::RpcMsg;
use tracing::debug;
use tracing::warn;

use crate::error::Result;
use crate::message::MessageReader;
use crate::message::MessageWriter;
use crate::remote::RemoteError;
use crate::signature::Method;
use crate::signature::method_tag;
use crate::transport;
use crate::transport::Transport;
use crate::transport::TransportError;

/// A caller bound to one transport.
pub struct Connection<T> {
    transport: T,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Loads `module` on the responder under the exact `version_key`.
    pub fn load_module(&mut self, module: &str, version_key: &str) -> transport::Result<()> {
        self.transport.load_module(module, version_key)
    }

    /// Invokes method `M` with `args` and waits for its result.
    ///
    /// `args` is anything convertible into `M::Args` through `Into`, such as
    /// the argument tuple itself.
    ///
    /// # Errors
    /// - `Error::Message` if the arguments do not fit a request or the reply lacks the result.
    /// - `Error::Transport` if the request could not be delivered, or the reply
    ///   answers another method.
    /// - `Error::Remote` if the responder reported a failure.
    pub fn call<M: Method>(&mut self, args: impl Into<M::Args>) -> Result<M::Output> {
        let args: M::Args = args.into();
        let tag = method_tag::<M>();
        let mut request = RpcMsg::new(tag.as_str());
        MessageWriter::new(&mut request).write_args(&args)?;

        debug!(method = %tag, keys = request.len(), "calling");
        let reply = self.transport.send_and_receive(request)?;
        if reply.method() != tag {
            warn!(method = %tag, reply = %reply.method(), "reply does not match request");
            return Err(TransportError::ReplyMismatch { expected: tag, found: reply.method().to_string() }.into());
        }

        if let Some(remote) = RemoteError::from_reply(&reply) {
            debug!(method = %tag, error = %remote, "call failed remotely");
            return Err(remote.into());
        }
        Ok(MessageReader::new(&reply).read::<M::Output>()?)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}
