//! End-to-end calls into the memory module, in-process and over TCP.

use std::sync::Arc;
use std::thread;

use keypack::RpcMsg;
use memsvc::MODULE_VERSION_KEY;
use memsvc::MemHub;
use memsvc::Read;
use memsvc::Write;
use tokio::net::TcpListener;
use typerpc::Connection;
use typerpc::Error;
use typerpc::LocalTransport;
use typerpc::ModuleManager;
use typerpc::StreamConfig;
use typerpc::StreamTransport;
use typerpc::Transport;
use typerpc::TransportError;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn memory_manager(size: u32) -> Arc<ModuleManager> {
    let manager = ModuleManager::new();
    memsvc::module_init(&manager, Arc::new(MemHub::with_contents((0..size).collect())));
    Arc::new(manager)
}

fn local(manager: &Arc<ModuleManager>) -> anyhow::Result<Connection<LocalTransport>> {
    let mut conn = Connection::new(LocalTransport::new(Arc::clone(manager)));
    conn.load_module("memory", MODULE_VERSION_KEY)?;
    Ok(conn)
}

#[test]
fn test_read_four_words() -> anyhow::Result<()> {
    init_tracing();
    let mut conn = local(&memory_manager(256))?;

    assert_eq!(conn.call::<Read>((0x10, 4))?, vec![0x10, 0x11, 0x12, 0x13]);
    assert_eq!(conn.call::<Read>((0x10, 0))?, Vec::<u32>::new());
    Ok(())
}

#[test]
fn test_write_then_read() -> anyhow::Result<()> {
    init_tracing();
    let mut conn = local(&memory_manager(16))?;

    conn.call::<Write>((2, vec![0xDEAD, 0xBEEF]))?;
    assert_eq!(conn.call::<Read>((1, 4))?, vec![1, 0xDEAD, 0xBEEF, 4]);
    conn.call::<Write>((0, Vec::new()))?;
    Ok(())
}

#[test]
fn test_out_of_range_is_remote_error() -> anyhow::Result<()> {
    init_tracing();
    let mut conn = local(&memory_manager(16))?;

    match conn.call::<Read>((12, 8)) {
        Err(Error::Remote(e)) => {
            assert_eq!(e.message(), "read memsvc error: access of 8 words at 0xc is outside memory of 16 words");
        }
        other => panic!("expected a remote error, got {:?}", other),
    }
    match conn.call::<Write>((15, vec![1, 2])) {
        Err(Error::Remote(e)) => assert!(e.message().starts_with("write memsvc error: ")),
        other => panic!("expected a remote error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_wrong_version_key_is_refused() {
    init_tracing();
    let mut conn = Connection::new(LocalTransport::new(memory_manager(4)));
    assert!(matches!(
        conn.load_module("memory", "memory v1.0.0"),
        Err(TransportError::VersionMismatch { .. })
    ));
    assert!(matches!(
        conn.call::<Read>((0, 1)),
        Err(Error::Transport(TransportError::ModuleNotLoaded(_)))
    ));
}

#[test]
fn test_signatures_listed() {
    let manager = memory_manager(4);
    let listed: Vec<String> = manager.signatures().iter().map(ToString::to_string).collect();
    assert_eq!(listed, vec![
        "memory.Read(word, word) -> word-array",
        "memory.Write(word, word-array) -> ()",
    ]);
    assert!(manager.has_method("memory.read"));
    assert!(manager.has_method("memory.write"));
}

#[test]
fn test_legacy_read_over_transport() -> anyhow::Result<()> {
    init_tracing();
    let mut transport = LocalTransport::new(memory_manager(32));
    transport.load_module("memory", MODULE_VERSION_KEY)?;

    let mut request = RpcMsg::new("memory.read");
    request.set_word(memsvc::ADDRESS_KEY, 8)?;
    request.set_word(memsvc::COUNT_KEY, 2)?;
    let reply = transport.send_and_receive(request)?;
    assert_eq!(reply.get_word_array(memsvc::DATA_KEY)?, &[8, 9]);

    // missing "count" is caught at the handler boundary
    let mut request = RpcMsg::new("memory.read");
    request.set_word(memsvc::ADDRESS_KEY, 8)?;
    let reply = transport.send_and_receive(request)?;
    assert_eq!(reply.get_string(typerpc::ERROR_KEY)?, "bad RPC key count");
    Ok(())
}

#[test]
fn test_over_tcp() -> anyhow::Result<()> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0"))?;
    let addr = listener.local_addr()?;
    let manager = memory_manager(1024);
    thread::spawn(move || runtime.block_on(typerpc::serve_listener(listener, manager, StreamConfig::default())));

    let mut conn = Connection::new(StreamTransport::connect(addr)?);
    assert!(matches!(
        conn.call::<Read>((0, 1)),
        Err(Error::Transport(TransportError::ModuleNotLoaded(_)))
    ));
    conn.load_module("memory", MODULE_VERSION_KEY)?;

    assert_eq!(conn.call::<Read>((0x10, 4))?, vec![0x10, 0x11, 0x12, 0x13]);
    conn.call::<Write>((0, vec![7; 8]))?;
    assert_eq!(conn.call::<Read>((0, 8))?, vec![7; 8]);

    match conn.call::<Read>((1020, 8)) {
        Err(Error::Remote(e)) => assert!(e.message().starts_with("read memsvc error: ")),
        other => panic!("expected a remote error, got {:?}", other),
    }

    // a second client does not share the first one's loaded modules
    let mut other = Connection::new(StreamTransport::connect(addr)?);
    assert!(matches!(
        other.call::<Read>((0, 1)),
        Err(Error::Transport(TransportError::ModuleNotLoaded(_)))
    ));
    other.load_module("memory", MODULE_VERSION_KEY)?;
    assert_eq!(other.call::<Read>((0, 2))?, vec![7, 7]);
    Ok(())
}
