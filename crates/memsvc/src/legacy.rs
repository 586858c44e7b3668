//! Named-key `memory.read` / `memory.write` handlers for callers that predate
//! the typed methods.
//!
//! These report hub failures by setting `"error"` themselves. Anything else
//! (a missing key, a reply too large) is caught by `invoke_raw`.

use keypack::RpcMsg;
use tracing::info;
use typerpc::ERROR_KEY;
use typerpc::Fault;

use crate::hub::MemHub;

pub const ADDRESS_KEY: &str = "address";
pub const COUNT_KEY: &str = "count";
pub const DATA_KEY: &str = "data";

/// Reads `count` words at `address` into `data`.
pub fn read(hub: &MemHub, request: &RpcMsg, response: &mut RpcMsg) -> Result<(), Fault> {
    let count = request.get_word(COUNT_KEY)?;
    let address = request.get_word(ADDRESS_KEY)?;
    match hub.read(address, count) {
        Ok(data) => response.set_word_array(DATA_KEY, &data)?,
        Err(e) => {
            response.set_string(ERROR_KEY, e.to_string())?;
            info!("read memsvc error: {}", e);
        }
    }
    Ok(())
}

/// Writes `data` at `address`.
pub fn write(hub: &MemHub, request: &RpcMsg, response: &mut RpcMsg) -> Result<(), Fault> {
    let data = request.get_word_array(DATA_KEY)?;
    let address = request.get_word(ADDRESS_KEY)?;
    if let Err(e) = hub.write(address, data) {
        response.set_string(ERROR_KEY, format!("memsvc error: {}", e))?;
        info!("write memsvc error: {}", e);
    }
    Ok(())
}
