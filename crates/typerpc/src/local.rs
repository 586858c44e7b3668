//! In-process loopback transport.
//!
//! Requests and replies still pass through the binary codec, so a call over
//! `LocalTransport` observes the same encoding as one over a socket.

use std::sync::Arc;

use keypack::RpcMsg;
use tracing::debug;

use crate::registry::ModuleManager;
use crate::registry::Session;
use crate::transport::Result;
use crate::transport::Transport;

/// A transport that dispatches straight into a `ModuleManager` in this process.
pub struct LocalTransport {
    manager: Arc<ModuleManager>,
    session: Session,
}

impl LocalTransport {
    pub fn new(manager: Arc<ModuleManager>) -> Self {
        Self { manager, session: Session::new() }
    }

    pub fn manager(&self) -> &ModuleManager {
        &self.manager
    }
}

impl Transport for LocalTransport {
    fn load_module(&mut self, module: &str, version_key: &str) -> Result<()> {
        self.session.load(&self.manager, module, version_key)
    }

    fn send_and_receive(&mut self, request: RpcMsg) -> Result<RpcMsg> {
        let bytes = request.encode()?;
        let request = RpcMsg::decode(&bytes)?;
        let reply = self.session.dispatch(&self.manager, &request)?;
        let bytes = reply.encode()?;
        debug!(method = %request.method(), request_len = request.encoded_len(), reply_len = bytes.len(), "local round trip");
        Ok(RpcMsg::decode(&bytes)?)
    }
}
