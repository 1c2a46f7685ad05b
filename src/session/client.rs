//! Client role: open-and-wait with a terminal disconnect.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use tokio::task::JoinHandle;

use super::{read_pump, spawn_watcher, write_message, SessionConfig, Shared};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::event::{EventHandler, PipeEvent};
use crate::protocol::{Deserializer, Receiver};
use crate::transport::{PipeReadHalf, PipeStream};

/// The client endpoint of a pipe session.
///
/// Opens a server-bound pipe name and exchanges messages until either side
/// disconnects. Unlike the server, a disconnect is terminal: the endpoint
/// does not reconnect, and later writes fail with `NotConnected`.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use pipelink::{PipeClient, PipeEvent, SessionConfig};
///
/// let client = PipeClient::connect(
///     r"\\.\pipe\demo",
///     SessionConfig::default(),
///     Arc::new(|event| {
///         if let PipeEvent::Received(bytes) = event {
///             println!("got {} bytes", bytes.len());
///         }
///     }),
/// )
/// .await?;
/// client.write(b"hello").await?;
/// client.shutdown().await;
/// ```
pub struct PipeClient {
    shared: Arc<Shared>,
    name: String,
    watcher: StdMutex<Option<JoinHandle<()>>>,
}

impl PipeClient {
    /// Open the pipe and start the session.
    ///
    /// Waits while every instance is busy; a missing name fails with the OS
    /// not-found error.
    pub async fn connect(name: &str, config: SessionConfig, handler: EventHandler) -> Result<Self> {
        config.validate()?;
        let stream = PipeStream::connect(name).await?;
        let (read_half, write_half) = stream.into_split();

        let shared = Shared::new(config, handler, Some(write_half));
        shared.connected.store(1, Ordering::Release);
        shared.emit(PipeEvent::Connected);

        let watcher = spawn_watcher(shared.clone(), run(shared.clone(), read_half));
        Ok(Self {
            shared,
            name: name.to_string(),
            watcher: StdMutex::new(Some(watcher)),
        })
    }

    /// Send one message to the server.
    pub async fn write(&self, bytes: &[u8]) -> Result<()> {
        write_message(&self.shared, bytes, &CancelToken::new()).await
    }

    /// Send one message, cancellable through `cancel`.
    pub async fn write_cancellable(&self, bytes: &[u8], cancel: &CancelToken) -> Result<()> {
        write_message(&self.shared, bytes, cancel).await
    }

    /// The pipe name this client opened.
    pub fn pipe_name(&self) -> &str {
        &self.name
    }

    /// Check whether the session is still up.
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
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

impl Drop for PipeClient {
    fn drop(&mut self) {
        self.shared.request_close();
    }
}

/// The client watcher: pump until the session ends, then tear down.
async fn run(shared: Arc<Shared>, mut read_half: PipeReadHalf) -> Result<()> {
    let mut close_rx = shared.subscribe_close();
    let mut receiver = Receiver::new(shared.config.buffer_size, shared.config.limit);
    let mut deserializer = Deserializer::new(shared.config.buffer_size, shared.config.limit);

    let end = read_pump(
        &shared,
        &mut read_half,
        &mut receiver,
        &mut deserializer,
        &mut close_rx,
        None,
    )
    .await;

    shared.writer.lock().await.take();
    let was_connected = shared.connected.swap(0, Ordering::AcqRel) > 0;
    match end {
        Ok(_) => {
            if was_connected {
                shared.emit(PipeEvent::Disconnected);
            }
            tracing::debug!("client session ended");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
