//! Typed `memory` methods.

use std::sync::Arc;

use tracing::info;
use typerpc::Fault;
use typerpc::Handler;
use typerpc::Method;

use crate::MODULE;
use crate::hub::MemHub;

/// Reads `count` words at `address`.
pub struct Read;

impl Method for Read {
    const MODULE: &'static str = MODULE;
    const NAME: &'static str = "Read";
    type Args = (u32, u32);
    type Output = Vec<u32>;
}

/// Writes `data` at `address`.
pub struct Write;

impl Method for Write {
    const MODULE: &'static str = MODULE;
    const NAME: &'static str = "Write";
    type Args = (u32, Vec<u32>);
    type Output = ();
}

/// Serves `Read` and `Write` from a shared `MemHub`.
#[derive(Clone)]
pub struct MemoryHandler {
    hub: Arc<MemHub>,
}

impl MemoryHandler {
    pub fn new(hub: Arc<MemHub>) -> Self {
        Self { hub }
    }
}

impl Handler<Read> for MemoryHandler {
    fn handle(&self, (address, count): (u32, u32)) -> Result<Vec<u32>, Fault> {
        self.hub.read(address, count).map_err(|e| {
            let message = format!("read memsvc error: {}", e);
            info!("{}", message);
            Fault::from(message)
        })
    }
}

impl Handler<Write> for MemoryHandler {
    fn handle(&self, (address, data): (u32, Vec<u32>)) -> Result<(), Fault> {
        self.hub.write(address, &data).map_err(|e| {
            let message = format!("write memsvc error: {}", e);
            info!("{}", message);
            Fault::from(message)
        })
    }
}
