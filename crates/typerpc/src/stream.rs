//! # Stream Transport
//!
//! Carries messages over any byte stream (TCP, Unix sockets, pipes) as
//! length-prefixed frames.
//!
//! ## Framing
//!
//! - **Frame**: `[Kind: 1b][Len: 4b][Body: Len]`, Len Little-Endian.
//! - **Call** (`0x01`): body is an encoded request message.
//! - **Load** (`0x02`): body is a message whose method is the module name and
//!   whose `"version"` key holds the version key.
//! - **Reply** (`0x81`): body is an encoded reply message (empty for a Load).
//! - **Refused** (`0x82`): body describes a `TransportError` under `"kind"` and
//!   `"detail"`.
//!
//! One frame in, one frame out. A frame larger than `max_frame_len` ends the
//! connection, since the stream cannot be resynchronised.
//!
//! The client side blocks on `std::io`. The responder runs on tokio, one task
//! per connection.

use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::sync::Arc;

use keypack::RpcMsg;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::registry::ModuleManager;
use crate::registry::Session;
use crate::transport::Result;
use crate::transport::Transport;
use crate::transport::TransportError;

const VERSION_KEY: &str = "version";
const KIND_KEY: &str = "kind";
const DETAIL_KEY: &str = "detail";

/// Limits applied to a stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Largest frame body accepted, in bytes.
    pub max_frame_len: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { max_frame_len: keypack::DEFAULT_LIMIT }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum FrameKind {
    Call = 0x01,
    Load = 0x02,
    Reply = 0x81,
    Refused = 0x82,
}

impl FrameKind {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Call),
            0x02 => Some(Self::Load),
            0x81 => Some(Self::Reply),
            0x82 => Some(Self::Refused),
            _ => None,
        }
    }
}

fn frame_header(kind: FrameKind, body: &[u8]) -> Result<[u8; 5]> {
    let len = u32::try_from(body.len())
        .map_err(|_| TransportError::FrameTooLarge { len: body.len(), max: u32::MAX as usize })?;
    let mut header = [kind as u8, 0, 0, 0, 0];
    header[1..].copy_from_slice(&len.to_le_bytes());
    Ok(header)
}

fn frame_kind(b: u8) -> Result<FrameKind> {
    FrameKind::from_u8(b).ok_or_else(|| TransportError::Refused(format!("unknown frame kind {:#04x}", b)))
}

fn frame_len(len: [u8; 4], max_len: usize) -> Result<usize> {
    let len = u32::from_le_bytes(len) as usize;
    if len > max_len {
        return Err(TransportError::FrameTooLarge { len, max: max_len });
    }
    Ok(len)
}

pub(crate) fn write_frame<W: Write>(w: &mut W, kind: FrameKind, body: &[u8]) -> Result<()> {
    w.write_all(&frame_header(kind, body)?)?;
    w.write_all(body)?;
    w.flush()?;
    Ok(())
}

/// Reads one frame. Returns `None` if the stream ends cleanly between frames.
pub(crate) fn read_frame<R: Read>(r: &mut R, max_len: usize) -> Result<Option<(FrameKind, Vec<u8>)>> {
    let mut kind = [0u8; 1];
    loop {
        match r.read(&mut kind) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let kind = frame_kind(kind[0])?;

    let mut len = [0u8; 4];
    r.read_exact(&mut len)?;
    let mut body = vec![0u8; frame_len(len, max_len)?];
    r.read_exact(&mut body)?;
    Ok(Some((kind, body)))
}

pub(crate) async fn write_frame_async<W: AsyncWrite + Unpin>(w: &mut W, kind: FrameKind, body: &[u8]) -> Result<()> {
    w.write_all(&frame_header(kind, body)?).await?;
    w.write_all(body).await?;
    w.flush().await?;
    Ok(())
}

pub(crate) async fn read_frame_async<R: AsyncRead + Unpin>(
    r: &mut R,
    max_len: usize,
) -> Result<Option<(FrameKind, Vec<u8>)>> {
    let mut kind = [0u8; 1];
    if r.read(&mut kind).await? == 0 {
        return Ok(None);
    }
    let kind = frame_kind(kind[0])?;

    let mut len = [0u8; 4];
    r.read_exact(&mut len).await?;
    let mut body = vec![0u8; frame_len(len, max_len)?];
    r.read_exact(&mut body).await?;
    Ok(Some((kind, body)))
}

fn encode_load(module: &str, version_key: &str) -> Result<Vec<u8>> {
    let mut msg = RpcMsg::new(module);
    msg.set_string(VERSION_KEY, version_key)?;
    Ok(msg.encode()?)
}

fn decode_load(body: &[u8]) -> Result<(String, String)> {
    let msg = RpcMsg::decode(body)?;
    let version_key = msg.get_string(VERSION_KEY)?.to_string();
    Ok((msg.method().to_string(), version_key))
}

/// Describes `error` so the client can rebuild the same variant.
pub(crate) fn encode_refusal(error: &TransportError) -> Result<Vec<u8>> {
    let (kind, detail): (&str, Vec<String>) = match error {
        TransportError::UnknownModule(module) => ("unknown-module", vec![module.clone()]),
        TransportError::VersionMismatch { module, expected, found } => {
            ("version-mismatch", vec![module.clone(), expected.clone(), found.clone()])
        }
        TransportError::ModuleNotLoaded(module) => ("module-not-loaded", vec![module.clone()]),
        TransportError::UnknownMethod(tag) => ("unknown-method", vec![tag.clone()]),
        TransportError::FrameTooLarge { len, max } => ("frame-too-large", vec![len.to_string(), max.to_string()]),
        other => ("refused", vec![other.to_string()]),
    };
    let mut msg = RpcMsg::new("");
    msg.set_string(KIND_KEY, kind)?;
    msg.set_string_array(DETAIL_KEY, &detail)?;
    Ok(msg.encode()?)
}

pub(crate) fn decode_refusal(body: &[u8]) -> Result<TransportError> {
    let msg = RpcMsg::decode(body)?;
    let kind = msg.get_string(KIND_KEY)?;
    let detail = msg.get_string_array(DETAIL_KEY)?;
    let field = |i: usize| detail.get(i).cloned().unwrap_or_default();
    let error = match kind {
        "unknown-module" => TransportError::UnknownModule(field(0)),
        "version-mismatch" => TransportError::VersionMismatch { module: field(0), expected: field(1), found: field(2) },
        "module-not-loaded" => TransportError::ModuleNotLoaded(field(0)),
        "unknown-method" => TransportError::UnknownMethod(field(0)),
        "frame-too-large" => TransportError::FrameTooLarge {
            len: field(0).parse().unwrap_or_default(),
            max: field(1).parse().unwrap_or_default(),
        },
        _ => TransportError::Refused(field(0)),
    };
    Ok(error)
}

/// A client connection over a byte stream.
///
/// Any framing or I/O failure leaves unread bytes behind, so the transport
/// marks itself broken and refuses every later request with `ConnectionLost`.
pub struct StreamTransport<S> {
    stream: S,
    config: StreamConfig,
    broken: bool,
}

impl StreamTransport<TcpStream> {
    /// Connects to a responder listening on `addr`.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, StreamConfig::default())
    }

    pub fn with_config(stream: S, config: StreamConfig) -> Self {
        Self { stream, config, broken: false }
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    fn round_trip(&mut self, kind: FrameKind, body: &[u8]) -> Result<Vec<u8>> {
        if self.broken {
            return Err(TransportError::ConnectionLost("stream desynchronised by an earlier error".into()));
        }
        let max_len = self.config.max_frame_len;
        let frame = write_frame(&mut self.stream, kind, body).and_then(|()| read_frame(&mut self.stream, max_len));
        match frame {
            Ok(Some((FrameKind::Reply, body))) => Ok(body),
            Ok(Some((FrameKind::Refused, body))) => Err(decode_refusal(&body)?),
            Ok(Some((other, _))) => {
                self.broken = true;
                Err(TransportError::Refused(format!("unexpected {:?} frame from responder", other)))
            }
            Ok(None) => {
                self.broken = true;
                Err(TransportError::ConnectionLost("peer closed the stream".into()))
            }
            Err(e) => {
                debug!(error = %e, "stream transport broken");
                self.broken = true;
                Err(e)
            }
        }
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn load_module(&mut self, module: &str, version_key: &str) -> Result<()> {
        let body = encode_load(module, version_key)?;
        self.round_trip(FrameKind::Load, &body)?;
        Ok(())
    }

    fn send_and_receive(&mut self, request: RpcMsg) -> Result<RpcMsg> {
        let body = request.encode()?;
        let reply = self.round_trip(FrameKind::Call, &body)?;
        Ok(RpcMsg::decode(&reply)?)
    }
}

/// Answers frames from one client until it disconnects.
///
/// Requests the responder cannot route are answered with a Refused frame and
/// the connection stays open. Oversized or unreadable frames end it. Methods
/// run on the connection's own task.
pub async fn serve<S>(mut stream: S, manager: &ModuleManager, config: &StreamConfig) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut session = Session::new();
    loop {
        let (kind, body) = match read_frame_async(&mut stream, config.max_frame_len).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "dropping connection");
                let sent = match encode_refusal(&e) {
                    Ok(refusal) => write_frame_async(&mut stream, FrameKind::Refused, &refusal).await,
                    Err(encode_err) => Err(encode_err),
                };
                if let Err(send_err) = sent {
                    debug!(error = %send_err, "refusal not delivered");
                }
                return Err(e);
            }
        };

        let answer = match kind {
            FrameKind::Call => RpcMsg::decode(&body)
                .map_err(TransportError::from)
                .and_then(|request| session.dispatch(manager, &request))
                .and_then(|reply| reply.encode().map_err(TransportError::from)),
            FrameKind::Load => decode_load(&body)
                .and_then(|(module, version_key)| session.load(manager, &module, &version_key))
                .map(|()| Vec::new()),
            FrameKind::Reply | FrameKind::Refused => {
                Err(TransportError::Refused(format!("unexpected {:?} frame from client", kind)))
            }
        };

        match answer {
            Ok(reply) => write_frame_async(&mut stream, FrameKind::Reply, &reply).await?,
            Err(e) => {
                warn!(error = %e, "refusing frame");
                write_frame_async(&mut stream, FrameKind::Refused, &encode_refusal(&e)?).await?;
            }
        }
    }
    debug!("client disconnected");
    Ok(())
}

/// Accepts connections forever, serving each on its own task.
///
/// Returns only if accepting fails.
pub async fn serve_listener(listener: TcpListener, manager: Arc<ModuleManager>, config: StreamConfig) -> Result<()> {
    info!(addr = ?listener.local_addr().ok(), "serving");
    loop {
        let (stream, peer) = listener.accept().await?;
        let manager = Arc::clone(&manager);
        debug!(peer = %peer, "accepted connection");
        tokio::spawn(async move {
            if let Err(e) = serve(stream, &manager, &config).await {
                warn!(peer = %peer, error = %e, "connection ended with error");
            }
        });
    }
}
