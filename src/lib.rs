//! # pipelink
//!
//! Framed message transport over a local, single-client, bidirectional
//! pipe: a Named Pipe on Windows, a Unix Domain Socket elsewhere.
//!
//! Either side of the pipe sends and receives length-delimited, in-order
//! messages of up to nearly 4 GB. Message boundaries survive arbitrary pipe
//! buffer fragmentation; the server admits one client at a time and re-arms
//! for the next client after a disconnect; in-flight sends can be cancelled
//! cooperatively.
//!
//! ## Architecture
//!
//! - **Wire codec** ([`protocol`]): an 8-byte packet header with
//!   start/end/cancel flags, a serializer that splits messages into bounded
//!   fragments, a receiver state machine that rebuilds packets across read
//!   boundaries, and a deserializer that reassembles packet runs into
//!   messages.
//! - **Session engine** ([`session`]): one watcher task per endpoint
//!   multiplexing connect, disconnect, read and close signals, with a
//!   single-writer discipline for sends.
//!
//! Lifecycle and data are delivered through a single callback per endpoint:
//! `Connected`, `Disconnected`, `Received`, `Exception`, `Closed`.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pipelink::{PipeClient, PipeEvent, PipeServer, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> pipelink::Result<()> {
//!     let name = pipelink::transport::generate_pipe_path();
//!
//!     let server = PipeServer::bind(&name, SessionConfig::default(), Arc::new(|event| {
//!         if let PipeEvent::Received(bytes) = event {
//!             println!("server got {} bytes", bytes.len());
//!         }
//!     }))?;
//!
//!     let client = PipeClient::connect(&name, SessionConfig::default(), Arc::new(|_| {})).await?;
//!     client.write(b"HELLO WORLD!").await?;
//!
//!     client.shutdown().await;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod transport;

pub use cancel::CancelToken;
pub use error::{PipeError, Result};
pub use event::{EventHandler, PipeEvent};
pub use protocol::{DEFAULT_BUFFER_SIZE, DEFAULT_LIMIT, MAX_MESSAGE_SIZE, MIN_BUFFER_SIZE};
pub use session::{PipeClient, PipeServer, SessionConfig};
