//! Session engine - endpoint state, the write path, and the read pump.
//!
//! Each endpoint owns one long-running watcher task that multiplexes
//! connect, disconnect, read and close signals, plus the shared state the
//! caller-facing handles operate on. The server and client roles build on
//! the same core:
//!
//! ```text
//! write() ──► Serializer ──► chunked writes ──► pipe
//! pipe ──► read pump ──► Receiver ──► Deserializer ──► Received callback
//! ```
//!
//! Writes hold the writer critical section for the whole message, so
//! concurrent writers interleave at message granularity only. The read pump
//! classifies peer-closed conditions as a disconnect status rather than an
//! error; the roles decide whether a disconnect re-arms the endpoint
//! (server) or ends it (client).

mod client;
mod server;

pub use client::PipeClient;
pub use server::PipeServer;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::cancel::CancelToken;
use crate::error::{PipeError, Result};
use crate::event::{EventHandler, PipeEvent};
use crate::protocol::{
    Buffer, Deserializer, Header, Reassembly, Receiver, Serializer, DEFAULT_BUFFER_SIZE,
    DEFAULT_LIMIT, MAX_MESSAGE_SIZE, MIN_BUFFER_SIZE,
};
use crate::transport::{PipeReadHalf, PipeWriteHalf};

/// Endpoint tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Per-direction pipe buffer and per-write split size.
    pub buffer_size: usize,
    /// Maximum reassembled message size.
    pub limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SessionConfig {
    /// Check the tunables against their hard floors and ceilings.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(PipeError::Length(format!(
                "buffer size {} is below the minimum {}",
                self.buffer_size, MIN_BUFFER_SIZE
            )));
        }
        if self.limit > MAX_MESSAGE_SIZE {
            return Err(PipeError::Length(format!(
                "limit {} exceeds the maximum message size {}",
                self.limit, MAX_MESSAGE_SIZE
            )));
        }
        Ok(())
    }
}

/// State shared between an endpoint handle and its watcher task.
pub(crate) struct Shared {
    pub(crate) config: SessionConfig,
    handler: EventHandler,
    /// The writer critical section. `None` while unconnected or closed.
    pub(crate) writer: Mutex<Option<PipeWriteHalf>>,
    close_tx: watch::Sender<bool>,
    pub(crate) connected: AtomicU32,
}

impl Shared {
    pub(crate) fn new(
        config: SessionConfig,
        handler: EventHandler,
        writer: Option<PipeWriteHalf>,
    ) -> Arc<Self> {
        let (close_tx, _) = watch::channel(false);
        Arc::new(Self {
            config,
            handler,
            writer: Mutex::new(writer),
            close_tx,
            connected: AtomicU32::new(0),
        })
    }

    /// Deliver an event to the user handler.
    pub(crate) fn emit(&self, event: PipeEvent<'_>) {
        (self.handler)(event);
    }

    pub(crate) fn close_requested(&self) -> bool {
        *self.close_tx.borrow()
    }

    /// Request shutdown. Idempotent.
    pub(crate) fn request_close(&self) {
        self.close_tx.send_replace(true);
    }

    pub(crate) fn subscribe_close(&self) -> watch::Receiver<bool> {
        self.close_tx.subscribe()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire) > 0
    }
}

/// How a read pump ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PumpEnd {
    /// The peer went away.
    Disconnected,
    /// The endpoint was asked to close.
    CloseRequested,
    /// A local disconnect was requested (server role).
    DisconnectRequested,
}

/// Classify the errors that mean "the peer is gone" rather than a failure.
pub(crate) fn is_disconnect_error(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    if matches!(
        e.kind(),
        ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
    ) {
        return true;
    }
    #[cfg(windows)]
    {
        // ERROR_BROKEN_PIPE, ERROR_NO_DATA, ERROR_PIPE_NOT_CONNECTED,
        // ERROR_PIPE_LISTENING
        if matches!(
            e.raw_os_error(),
            Some(109) | Some(232) | Some(233) | Some(536)
        ) {
            return true;
        }
    }
    false
}

/// Send one whole message under the writer critical section.
///
/// The message is split into packets of at most `buffer_size` payload bytes;
/// the cancel flag is checked between packets, and a cancellation emits one
/// cancel packet so the peer discards its partial reassembly. A cancellation
/// that arrives after the final packet loses the race and the write
/// succeeds.
pub(crate) async fn write_message(
    shared: &Shared,
    bytes: &[u8],
    cancel: &CancelToken,
) -> Result<()> {
    if shared.close_requested() {
        return Err(PipeError::NotConnected);
    }
    if bytes.len() > shared.config.limit {
        return Err(PipeError::Length(format!(
            "message size {} exceeds limit {}",
            bytes.len(),
            shared.config.limit
        )));
    }
    if cancel.is_cancelled() {
        return Err(PipeError::Cancelled);
    }

    let mut guard = tokio::select! {
        guard = shared.writer.lock() => guard,
        _ = cancel.cancelled() => return Err(PipeError::Cancelled),
    };
    let writer = guard.as_mut().ok_or(PipeError::NotConnected)?;

    let mut serializer = Serializer::new(Buffer::new(bytes), shared.config.buffer_size);
    let mut cancelled = false;
    while let Some((fragment, header)) = serializer.next() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        write_raw(writer, &header.encode(), shared.config.buffer_size).await?;
        write_raw(writer, fragment.as_slice(), shared.config.buffer_size).await?;
    }

    if cancelled {
        write_raw(writer, &Header::cancel().encode(), shared.config.buffer_size).await?;
        writer.flush().await?;
        return Err(PipeError::Cancelled);
    }

    writer.flush().await?;
    Ok(())
}

/// Write a raw byte region in chunks bounded by the pipe buffer size.
async fn write_raw(writer: &mut PipeWriteHalf, bytes: &[u8], chunk_ceiling: usize) -> Result<()> {
    for chunk in bytes.chunks(chunk_ceiling) {
        writer.write_all(chunk).await?;
    }
    Ok(())
}

async fn wait_disconnect(rx: &mut Option<&mut watch::Receiver<u64>>) {
    match rx {
        Some(rx) => {
            let _ = rx.changed().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Drive reads until the peer disconnects or a local signal fires.
///
/// Every read lands in the receiver; completed packets flow through the
/// deserializer; completed messages are delivered as `Received` events.
pub(crate) async fn read_pump(
    shared: &Shared,
    reader: &mut PipeReadHalf,
    receiver: &mut Receiver,
    deserializer: &mut Deserializer,
    close: &mut watch::Receiver<bool>,
    disconnect: Option<&mut watch::Receiver<u64>>,
) -> Result<PumpEnd> {
    let mut disconnect = disconnect;
    let mut buf = vec![0u8; shared.config.buffer_size];
    loop {
        let n = tokio::select! {
            _ = close.wait_for(|closed| *closed) => return Ok(PumpEnd::CloseRequested),
            _ = wait_disconnect(&mut disconnect) => return Ok(PumpEnd::DisconnectRequested),
            res = reader.read(&mut buf) => match res {
                Ok(0) => return Ok(PumpEnd::Disconnected),
                Ok(n) => n,
                Err(e) if is_disconnect_error(&e) => return Ok(PumpEnd::Disconnected),
                Err(e) => return Err(e.into()),
            },
        };
        dispatch_bytes(shared, receiver, deserializer, &buf[..n])?;
    }
}

fn dispatch_bytes(
    shared: &Shared,
    receiver: &mut Receiver,
    deserializer: &mut Deserializer,
    bytes: &[u8],
) -> Result<()> {
    receiver.feed(bytes, |packet| {
        match deserializer.feed(packet)? {
            Reassembly::Complete(message) => shared.emit(PipeEvent::Received(message)),
            Reassembly::Cancelled => {
                tracing::debug!("peer cancelled its in-flight message");
            }
            Reassembly::Incomplete => {}
        }
        Ok(())
    })
}

/// Spawn the role loop and its supervisor.
///
/// The supervisor observes how the role loop terminated: an error or a
/// panic (a throwing user handler) surfaces as one final `Exception` event;
/// either way the endpoint ends with a terminal `Closed` event.
pub(crate) fn spawn_watcher<F>(shared: Arc<Shared>, role_loop: F) -> JoinHandle<()>
where
    F: std::future::Future<Output = Result<()>> + Send + 'static,
{
    let inner = tokio::spawn(role_loop);
    tokio::spawn(async move {
        match inner.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("watcher terminated with error: {}", e);
                shared.writer.lock().await.take();
                shared.emit(PipeEvent::Exception(&e));
            }
            Err(join_err) => {
                let e = PipeError::Task(join_err.to_string());
                tracing::error!("watcher task aborted: {}", e);
                shared.writer.lock().await.take();
                shared.emit(PipeEvent::Exception(&e));
            }
        }
        shared.request_close();
        shared.emit(PipeEvent::Closed);
    })
}
