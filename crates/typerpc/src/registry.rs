//! # Module Registry
//!
//! The responder's table of modules and method endpoints.
//!
//! Uses DashMap so handlers can be registered while connections are being
//! served, without a global lock around dispatch.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use keypack::RpcMsg;
use tracing::debug;
use tracing::info;

use crate::error::Fault;
use crate::invoke::FnHandler;
use crate::invoke::Handler;
use crate::invoke::invoke;
use crate::invoke::invoke_raw;
use crate::signature::Method;
use crate::signature::Signature;
use crate::signature::method_tag;
use crate::transport::Result;
use crate::transport::TransportError;

type Endpoint = dyn Fn(&RpcMsg, &mut RpcMsg) + Send + Sync;

struct Entry {
    endpoint: Arc<Endpoint>,
    signature: Option<Signature>,
}

/// Registered modules and their method endpoints.
pub struct ModuleManager {
    modules: DashMap<String, String>,
    methods: DashMap<String, Entry>,
    reply_limit: usize,
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleManager {
    pub fn new() -> Self {
        Self::with_reply_limit(keypack::DEFAULT_LIMIT)
    }

    /// Creates a registry whose replies are bounded by `reply_limit` bytes.
    pub fn with_reply_limit(reply_limit: usize) -> Self {
        Self { modules: DashMap::new(), methods: DashMap::new(), reply_limit }
    }

    pub fn reply_limit(&self) -> usize {
        self.reply_limit
    }

    /// Registers `module` under its exact version key. Re-registering replaces the key.
    pub fn register_module(&self, module: impl Into<String>, version_key: impl Into<String>) {
        let module = module.into();
        let version_key = version_key.into();
        info!(module = %module, version = %version_key, "registered module");
        self.modules.insert(module, version_key);
    }

    /// Registers a typed handler for `M`, replacing any previous endpoint for its tag.
    pub fn register<M: Method, H: Handler<M>>(&self, handler: H) {
        let handler = Arc::new(handler);
        let endpoint: Arc<Endpoint> = Arc::new(move |request: &RpcMsg, response: &mut RpcMsg| {
            invoke::<M, H>(&*handler, request, response)
        });
        let signature = Signature::of::<M>();
        debug!(signature = %signature, "registered method");
        self.methods.insert(method_tag::<M>(), Entry { endpoint, signature: Some(signature) });
    }

    /// Registers a closure as the handler for `M`.
    pub fn register_fn<M, F>(&self, f: F)
    where
        M: Method,
        F: Fn(M::Args) -> std::result::Result<M::Output, Fault> + Send + Sync + 'static,
    {
        self.register::<M, _>(FnHandler::<M, F>::new(f));
    }

    /// Registers an untyped handler that works on the messages directly.
    pub fn register_raw<F>(&self, module: &str, name: &str, f: F)
    where
        F: Fn(&RpcMsg, &mut RpcMsg) -> std::result::Result<(), Fault> + Send + Sync + 'static,
    {
        let tag = format!("{}.{}", module, name);
        let endpoint: Arc<Endpoint> = Arc::new(move |request: &RpcMsg, response: &mut RpcMsg| {
            invoke_raw(&f, request, response)
        });
        debug!(method = %tag, "registered raw method");
        self.methods.insert(tag, Entry { endpoint, signature: None });
    }

    /// Checks that `module` is registered under exactly `version_key`.
    pub fn check_load(&self, module: &str, version_key: &str) -> Result<()> {
        let expected = self
            .modules
            .get(module)
            .ok_or_else(|| TransportError::UnknownModule(module.to_string()))?;
        if expected.value() != version_key {
            return Err(TransportError::VersionMismatch {
                module: module.to_string(),
                expected: expected.value().clone(),
                found: version_key.to_string(),
            });
        }
        Ok(())
    }

    pub fn has_method(&self, tag: &str) -> bool {
        self.methods.contains_key(tag)
    }

    /// Runs the endpoint registered for the request's tag.
    ///
    /// Method failures come back as `Ok` replies carrying `"error"`. Only a
    /// missing endpoint is a transport error.
    pub fn dispatch(&self, request: &RpcMsg) -> Result<RpcMsg> {
        let endpoint = self
            .methods
            .get(request.method())
            .map(|entry| Arc::clone(&entry.endpoint))
            .ok_or_else(|| TransportError::UnknownMethod(request.method().to_string()))?;

        debug!(method = %request.method(), keys = request.len(), "dispatching");
        let mut response = RpcMsg::with_limit(request.method(), self.reply_limit);
        endpoint(request, &mut response);
        Ok(response)
    }

    /// Signatures of every typed method, sorted by tag. Raw handlers have none.
    pub fn signatures(&self) -> Vec<Signature> {
        let mut signatures: Vec<Signature> =
            self.methods.iter().filter_map(|entry| entry.value().signature.clone()).collect();
        signatures.sort_by_key(Signature::tag);
        signatures
    }
}

/// The modules one connection has loaded.
#[derive(Debug, Default)]
pub struct Session {
    loaded: HashSet<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, module: &str) -> bool {
        self.loaded.contains(module)
    }

    /// Loads `module` for this connection after checking its version key.
    pub fn load(&mut self, manager: &ModuleManager, module: &str, version_key: &str) -> Result<()> {
        manager.check_load(module, version_key)?;
        if self.loaded.insert(module.to_string()) {
            info!(module = %module, "loaded module");
        }
        Ok(())
    }

    /// Dispatches `request` if its module has been loaded on this connection.
    pub fn dispatch(&self, manager: &ModuleManager, request: &RpcMsg) -> Result<RpcMsg> {
        let module = match request.method().split_once('.') {
            Some((module, _)) => module,
            None => return Err(TransportError::UnknownMethod(request.method().to_string())),
        };
        if !self.is_loaded(module) {
            return Err(TransportError::ModuleNotLoaded(module.to_string()));
        }
        manager.dispatch(request)
    }
}
