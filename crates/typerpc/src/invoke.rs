//! # Invoke Path
//!
//! Runs a method implementation against a request message and fills in the
//! response message.
//!
//! ## Invariants
//! - **No Escape**: Whatever the implementation does (return an error, panic,
//!   or hand back something that does not fit the reply), the failure ends up
//!   in the response under `"error"` and never unwinds past `invoke`.
//! - **Exact Message**: The `"error"` text is the `Display` of the fault the
//!   implementation returned, or the panic payload, unmodified.
//! - **Fatal Fallback**: If the error key itself cannot be written, the process
//!   aborts. A responder that cannot report failures must not keep serving.

use std::fmt;
use std::marker::PhantomData;
use std::panic;
use std::panic::AssertUnwindSafe;

use keypack::RpcMsg;
use tracing::debug;
use tracing::error;

use crate::backtrace;
use crate::backtrace::BACKTRACE_DEPTH;
use crate::error::Fault;
use crate::message::MessageReader;
use crate::message::MessageWriter;
use crate::remote::BACKTRACE_KEY;
use crate::remote::ERROR_KEY;
use crate::signature::Method;

/// Message used when a panic payload carries no text.
pub const UNKNOWN_FAILURE: &str = "caught unknown exception";

/// A responder-side implementation of method `M`.
pub trait Handler<M: Method>: Send + Sync + 'static {
    fn handle(&self, args: M::Args) -> Result<M::Output, Fault>;
}

/// Adapts a closure into a `Handler`.
pub struct FnHandler<M, F> {
    f: F,
    _method: PhantomData<fn() -> M>,
}

impl<M, F> FnHandler<M, F> {
    pub fn new(f: F) -> Self {
        Self { f, _method: PhantomData }
    }
}

impl<M, F> Handler<M> for FnHandler<M, F>
where
    M: Method,
    F: Fn(M::Args) -> Result<M::Output, Fault> + Send + Sync + 'static,
{
    fn handle(&self, args: M::Args) -> Result<M::Output, Fault> {
        (self.f)(args)
    }
}

/// Why a guarded body did not complete.
enum Failure {
    Decode(keypack::Error),
    Fault(Fault),
    Encode(keypack::Error),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) | Self::Encode(e) => write!(f, "{}", e),
            Self::Fault(e) => write!(f, "{}", e),
        }
    }
}

/// Reads `M::Args` from `request`, runs `handler`, and writes the result to `response`.
pub fn invoke<M, H>(handler: &H, request: &RpcMsg, response: &mut RpcMsg)
where
    M: Method,
    H: Handler<M> + ?Sized,
{
    guarded(response, |response| {
        let args = MessageReader::new(request).read_args::<M::Args>().map_err(Failure::Decode)?;
        let output = handler.handle(args).map_err(Failure::Fault)?;
        MessageWriter::new(response).write(&output).map_err(Failure::Encode)
    });
}

/// Runs an untyped handler that reads `request` and writes `response` itself,
/// with the same failure guarantees as `invoke`.
pub fn invoke_raw<F>(handler: &F, request: &RpcMsg, response: &mut RpcMsg)
where
    F: Fn(&RpcMsg, &mut RpcMsg) -> Result<(), Fault> + ?Sized,
{
    guarded(response, |response| handler(request, response).map_err(Failure::Fault));
}

fn guarded<B>(response: &mut RpcMsg, body: B)
where
    B: FnOnce(&mut RpcMsg) -> Result<(), Failure>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut *response)));
    let message = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(failure)) => failure.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };
    error!(method = %response.method(), error = %message, "caught failure while invoking method");
    if let Err(e) = write_failure(response, &message) {
        fatal(response.method(), &message, &e);
    }
}

/// Extracts the text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        UNKNOWN_FAILURE.to_string()
    }
}

/// Replaces whatever `response` holds with an error report.
///
/// Writes `message` under `"error"` and, when one can be captured and fits,
/// the current call stack under `"backtrace"`. Fails only if the error key
/// itself cannot be written.
pub fn write_failure(response: &mut RpcMsg, message: &str) -> keypack::Result<()> {
    response.clear();
    response.set_string(ERROR_KEY, message)?;
    match backtrace::capture(BACKTRACE_DEPTH) {
        Some(frames) => {
            if let Err(e) = response.set_string_array(BACKTRACE_KEY, &frames) {
                debug!(error = %e, "dropping backtrace from error reply");
            }
        }
        None => debug!("no backtrace available for error reply"),
    }
    Ok(())
}

fn fatal(method: &str, message: &str, cause: &keypack::Error) -> ! {
    error!(method = %method, error = %message, cause = %cause, "unable to report failure, aborting");
    std::process::abort()
}
