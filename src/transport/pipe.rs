//! Platform-specific pipe implementation.
//!
//! - Unix: Unix Domain Socket
//! - Windows: Named Pipe (duplex, byte mode, overlapped, local clients only,
//!   one instance)
//!
//! # Example
//!
//! ```ignore
//! use pipelink::transport::{generate_pipe_path, PipeListener, PipeStream};
//!
//! let path = generate_pipe_path();
//! let listener = PipeListener::bind(&path, 64 * 1024)?;
//! let server_side = listener.accept().await?;
//! let client_side = PipeStream::connect(&path).await?;
//! ```

use crate::error::Result;

// ============================================================================
// Unix Implementation
// ============================================================================

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::path::Path;
    use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
    use tokio::net::{UnixListener, UnixStream};

    /// Read half of a connected pipe stream.
    pub type PipeReadHalf = OwnedReadHalf;
    /// Write half of a connected pipe stream.
    pub type PipeWriteHalf = OwnedWriteHalf;

    /// Unix Domain Socket listener.
    pub struct PipeListener {
        listener: UnixListener,
        path: String,
    }

    /// Unix Domain Socket stream (connected).
    pub struct PipeStream {
        stream: UnixStream,
    }

    impl PipeListener {
        /// Bind to a socket path.
        ///
        /// Removes any stale socket file at the path before binding. The
        /// `buffer_size` hint has no socket-level counterpart on Unix.
        pub fn bind(path: &str, _buffer_size: usize) -> Result<Self> {
            if Path::new(path).exists() {
                std::fs::remove_file(path)?;
            }

            let listener = UnixListener::bind(path)?;

            Ok(Self {
                listener,
                path: path.to_string(),
            })
        }

        /// Accept a single connection.
        pub async fn accept(&self) -> Result<PipeStream> {
            let (stream, _addr) = self.listener.accept().await?;
            Ok(PipeStream { stream })
        }

        /// Get the socket path.
        pub fn path(&self) -> &str {
            &self.path
        }
    }

    impl Drop for PipeListener {
        fn drop(&mut self) {
            // Clean up the socket file when the listener is dropped.
            let _ = std::fs::remove_file(&self.path);
        }
    }

    impl PipeStream {
        /// Connect to a listening socket.
        pub async fn connect(path: &str) -> Result<Self> {
            let stream = UnixStream::connect(path).await?;
            Ok(Self { stream })
        }

        /// Split into owned read and write halves.
        pub fn into_split(self) -> (PipeReadHalf, PipeWriteHalf) {
            self.stream.into_split()
        }

        /// Rejoin halves produced by [`into_split`](Self::into_split).
        pub fn reunite(read: PipeReadHalf, write: PipeWriteHalf) -> Option<Self> {
            read.reunite(write).ok().map(|stream| Self { stream })
        }

        /// Detach the peer on the server side.
        ///
        /// No-op on Unix; dropping the stream closes the connection.
        pub fn server_disconnect(&self) -> Result<()> {
            Ok(())
        }
    }
}

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(windows)]
mod windows_impl {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::net::windows::named_pipe::{
        ClientOptions, NamedPipeClient, NamedPipeServer, PipeMode, ServerOptions,
    };

    /// All pipe instances are busy (WaitNamedPipe would block).
    const ERROR_PIPE_BUSY: i32 = 231;
    /// The pipe instance has no attached client.
    const ERROR_PIPE_NOT_CONNECTED: i32 = 233;

    /// Delay between busy-open retries, matching the conventional
    /// WaitNamedPipe polling cadence.
    const BUSY_RETRY_DELAY: Duration = Duration::from_millis(50);
    /// Retries before a busy pipe is reported to the caller.
    const BUSY_RETRY_LIMIT: u32 = 100;

    /// Read half of a connected pipe stream.
    pub type PipeReadHalf = tokio::io::ReadHalf<PipeStream>;
    /// Write half of a connected pipe stream.
    pub type PipeWriteHalf = tokio::io::WriteHalf<PipeStream>;

    /// Windows Named Pipe listener.
    pub struct PipeListener {
        path: String,
        buffer_size: usize,
        /// Instance created by `bind` to claim the name, consumed by the
        /// first accept.
        first: Mutex<Option<NamedPipeServer>>,
    }

    enum Kind {
        Server(NamedPipeServer),
        Client(NamedPipeClient),
    }

    /// Windows Named Pipe stream (connected).
    pub struct PipeStream {
        inner: Kind,
    }

    impl PipeListener {
        /// Create the named pipe instance and claim the name.
        ///
        /// A duplicate name fails here with the OS error from the first-
        /// instance flag.
        pub fn bind(path: &str, buffer_size: usize) -> Result<Self> {
            let first = Self::create_instance(path, buffer_size, true)?;
            Ok(Self {
                path: path.to_string(),
                buffer_size,
                first: Mutex::new(Some(first)),
            })
        }

        fn create_instance(
            path: &str,
            buffer_size: usize,
            first_instance: bool,
        ) -> Result<NamedPipeServer> {
            let server = ServerOptions::new()
                .first_pipe_instance(first_instance)
                .pipe_mode(PipeMode::Byte)
                .reject_remote_clients(true)
                .max_instances(1)
                .in_buffer_size(buffer_size as u32)
                .out_buffer_size(buffer_size as u32)
                .create(path)?;
            Ok(server)
        }

        /// Accept a single connection.
        pub async fn accept(&self) -> Result<PipeStream> {
            let held = self.first.lock().expect("listener mutex poisoned").take();
            let server = match held {
                Some(server) => server,
                None => Self::create_instance(&self.path, self.buffer_size, false)?,
            };
            server.connect().await?;
            Ok(PipeStream {
                inner: Kind::Server(server),
            })
        }

        /// Get the pipe path.
        pub fn path(&self) -> &str {
            &self.path
        }
    }

    impl PipeStream {
        /// Open the client end, retrying while every instance is busy.
        pub async fn connect(path: &str) -> Result<Self> {
            let mut attempts = 0;
            loop {
                match ClientOptions::new().open(path) {
                    Ok(client) => {
                        return Ok(Self {
                            inner: Kind::Client(client),
                        })
                    }
                    Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY) => {
                        attempts += 1;
                        if attempts > BUSY_RETRY_LIMIT {
                            return Err(e.into());
                        }
                        tokio::time::sleep(BUSY_RETRY_DELAY).await;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        /// Split into read and write halves.
        pub fn into_split(self) -> (PipeReadHalf, PipeWriteHalf) {
            tokio::io::split(self)
        }

        /// Rejoin halves produced by [`into_split`](Self::into_split).
        pub fn reunite(read: PipeReadHalf, write: PipeWriteHalf) -> Option<Self> {
            if read.is_pair_of(&write) {
                Some(read.unsplit(write))
            } else {
                None
            }
        }

        /// Detach the peer on the server side so the instance can be
        /// re-armed. An already-detached instance is not an error.
        pub fn server_disconnect(&self) -> Result<()> {
            if let Kind::Server(server) = &self.inner {
                if let Err(e) = server.disconnect() {
                    if e.raw_os_error() != Some(ERROR_PIPE_NOT_CONNECTED) {
                        return Err(e.into());
                    }
                }
            }
            Ok(())
        }
    }

    impl tokio::io::AsyncRead for PipeStream {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            match &mut self.inner {
                Kind::Server(pipe) => std::pin::Pin::new(pipe).poll_read(cx, buf),
                Kind::Client(pipe) => std::pin::Pin::new(pipe).poll_read(cx, buf),
            }
        }
    }

    impl tokio::io::AsyncWrite for PipeStream {
        fn poll_write(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            match &mut self.inner {
                Kind::Server(pipe) => std::pin::Pin::new(pipe).poll_write(cx, buf),
                Kind::Client(pipe) => std::pin::Pin::new(pipe).poll_write(cx, buf),
            }
        }

        fn poll_flush(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            match &mut self.inner {
                Kind::Server(pipe) => std::pin::Pin::new(pipe).poll_flush(cx),
                Kind::Client(pipe) => std::pin::Pin::new(pipe).poll_flush(cx),
            }
        }

        fn poll_shutdown(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            match &mut self.inner {
                Kind::Server(pipe) => std::pin::Pin::new(pipe).poll_shutdown(cx),
                Kind::Client(pipe) => std::pin::Pin::new(pipe).poll_shutdown(cx),
            }
        }
    }
}

// ============================================================================
// Platform-independent re-exports
// ============================================================================

#[cfg(unix)]
pub use unix_impl::{PipeListener, PipeReadHalf, PipeStream, PipeWriteHalf};

#[cfg(windows)]
pub use windows_impl::{PipeListener, PipeReadHalf, PipeStream, PipeWriteHalf};
