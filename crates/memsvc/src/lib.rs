//! # Memory Module
//!
//! Exposes a word-addressed `MemHub` as the `memory` module:
//!
//! - `memory.Read(address, count) -> words` and `memory.Write(address, words)`,
//!   the typed methods.
//! - `memory.read` / `memory.write`, the named-key handlers kept for older callers.
//!
//! Callers must load the module under `MODULE_VERSION_KEY` before calling it.

use std::sync::Arc;

use tracing::info;
use typerpc::ModuleManager;

mod hub;
mod legacy;
mod methods;


pub use crate::hub::MemError;
pub use crate::hub::MemHub;
pub use crate::legacy::ADDRESS_KEY;
pub use crate::legacy::COUNT_KEY;
pub use crate::legacy::DATA_KEY;
pub use crate::methods::MemoryHandler;
pub use crate::methods::Read;
pub use crate::methods::Write;

pub const MODULE: &str = "memory";

/// The exact key a caller must present to load this module.
pub const MODULE_VERSION_KEY: &str = "memory v1.0.1";

/// Registers the module and all of its handlers with `manager`.
pub fn module_init(manager: &ModuleManager, hub: Arc<MemHub>) {
    manager.register_module(MODULE, MODULE_VERSION_KEY);

    let legacy_hub = Arc::clone(&hub);
    manager.register_raw(MODULE, "read", move |request, response| legacy::read(&legacy_hub, request, response));
    let legacy_hub = Arc::clone(&hub);
    manager.register_raw(MODULE, "write", move |request, response| legacy::write(&legacy_hub, request, response));

    let handler = MemoryHandler::new(hub);
    manager.register::<Read, _>(handler.clone());
    manager.register::<Write, _>(handler);

    info!(module = MODULE, "memory module initialized");
}
