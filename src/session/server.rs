//! Server role: one-at-a-time client admission with post-disconnect re-arm.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{read_pump, spawn_watcher, write_message, PumpEnd, SessionConfig, Shared};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::event::{EventHandler, PipeEvent};
use crate::protocol::{Deserializer, Receiver};
use crate::transport::{PipeListener, PipeStream};

/// The server endpoint of a pipe session.
///
/// Binds a pipe name, admits one client at a time, and re-arms for the next
/// client after the current one detaches. Binding an already-bound name
/// fails in the constructor with the OS error.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use pipelink::{PipeEvent, PipeServer, SessionConfig};
///
/// let server = PipeServer::bind(
///     r"\\.\pipe\demo",
///     SessionConfig::default(),
///     Arc::new(|event| {
///         if let PipeEvent::Received(bytes) = event {
///             println!("got {} bytes", bytes.len());
///         }
///     }),
/// )?;
/// server.write(b"hello").await?;
/// server.shutdown().await;
/// ```
pub struct PipeServer {
    shared: Arc<Shared>,
    name: String,
    disconnect_tx: watch::Sender<u64>,
    watcher: StdMutex<Option<JoinHandle<()>>>,
}

impl PipeServer {
    /// Create the pipe and start watching for clients.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(name: &str, config: SessionConfig, handler: EventHandler) -> Result<Self> {
        config.validate()?;
        let listener = PipeListener::bind(name, config.buffer_size)?;
        let shared = Shared::new(config, handler, None);
        let (disconnect_tx, disconnect_rx) = watch::channel(0u64);
        let watcher = spawn_watcher(shared.clone(), run(shared.clone(), listener, disconnect_rx));
        Ok(Self {
            shared,
            name: name.to_string(),
            disconnect_tx,
            watcher: StdMutex::new(Some(watcher)),
        })
    }

    /// Send one message to the attached client.
    ///
    /// Fails with `NotConnected` while no client is attached.
    pub async fn write(&self, bytes: &[u8]) -> Result<()> {
        write_message(&self.shared, bytes, &CancelToken::new()).await
    }

    /// Send one message, cancellable through `cancel`.
    pub async fn write_cancellable(&self, bytes: &[u8], cancel: &CancelToken) -> Result<()> {
        write_message(&self.shared, bytes, cancel).await
    }

    /// The pipe name this server is bound to.
    pub fn pipe_name(&self) -> &str {
        &self.name
    }

    /// Check whether a client is currently attached.
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Detach the current client and re-arm for the next one.
    ///
    /// No-op while no client is attached.
    pub fn disconnect(&self) {
        if self.shared.is_connected() {
            self.disconnect_tx.send_modify(|generation| *generation += 1);
        }
    }

    /// Request shutdown. Idempotent; safe from any thread.
    pub fn close(&self) {
        self.shared.request_close();
    }

    /// Close and wait for the watcher to finish.
    pub async fn shutdown(&self) {
        self.close();
        let watcher = self.watcher.lock().expect("watcher mutex poisoned").take();
        if let Some(watcher) = watcher {
            let _ = watcher.await;
        }
    }
}

impl Drop for PipeServer {
    fn drop(&mut self) {
        self.shared.request_close();
    }
}

/// The server watcher: accept, pump, tear down, re-arm.
async fn run(
    shared: Arc<Shared>,
    listener: PipeListener,
    mut disconnect_rx: watch::Receiver<u64>,
) -> Result<()> {
    let mut close_rx = shared.subscribe_close();
    let mut receiver = Receiver::new(shared.config.buffer_size, shared.config.limit);
    let mut deserializer = Deserializer::new(shared.config.buffer_size, shared.config.limit);

    loop {
        let stream = tokio::select! {
            _ = close_rx.wait_for(|closed| *closed) => break,
            res = listener.accept() => res?,
        };
        // Disconnect requests from before this client attached are void.
        let _ = disconnect_rx.borrow_and_update();

        shared.connected.fetch_add(1, Ordering::AcqRel);
        shared.emit(PipeEvent::Connected);
        tracing::debug!(pipe = listener.path(), "client attached");

        let (mut read_half, write_half) = stream.into_split();
        *shared.writer.lock().await = Some(write_half);

        let end = read_pump(
            &shared,
            &mut read_half,
            &mut receiver,
            &mut deserializer,
            &mut close_rx,
            Some(&mut disconnect_rx),
        )
        .await;

        // Connection teardown, also on the error path: invalidate the
        // writer, settle the connected count, detach the OS pipe.
        let write_half = shared.writer.lock().await.take();
        if shared.connected.load(Ordering::Acquire) > 0 {
            shared.connected.fetch_sub(1, Ordering::AcqRel);
            if end.is_ok() {
                shared.emit(PipeEvent::Disconnected);
            }
        }
        if let Some(write_half) = write_half {
            if let Some(stream) = PipeStream::reunite(read_half, write_half) {
                if let Err(e) = stream.server_disconnect() {
                    tracing::debug!("ignoring teardown disconnect error: {}", e);
                }
            }
        }
        receiver.reset();
        deserializer.reset();

        match end? {
            PumpEnd::CloseRequested => break,
            PumpEnd::Disconnected | PumpEnd::DisconnectRequested => {
                tracing::debug!(pipe = listener.path(), "re-arming for the next client");
            }
        }
    }

    shared.writer.lock().await.take();
    Ok(())
}
