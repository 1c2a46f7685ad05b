//! Event taxonomy and the user callback surface.
//!
//! Each endpoint delivers its lifecycle through a single callback. Events
//! arrive from the endpoint's watcher task; payload views are valid only for
//! the duration of the call, so a handler that needs the bytes later copies
//! them out.

use std::sync::Arc;

use crate::error::PipeError;

/// An endpoint lifecycle event.
#[derive(Debug)]
pub enum PipeEvent<'a> {
    /// A peer session is established: the server admitted a client, or the
    /// client opened its session. Strictly precedes any `Received`.
    Connected,
    /// The peer closed or a local disconnect completed. Last event of a
    /// connection.
    Disconnected,
    /// A complete message was reassembled. The view borrows the endpoint's
    /// reassembly pool.
    Received(&'a [u8]),
    /// The watcher task died abnormally; no further connection events
    /// follow.
    Exception(&'a PipeError),
    /// The endpoint is shut down. Terminal.
    Closed,
}

/// The per-endpoint event callback.
///
/// Handlers run on the endpoint's watcher task; a panicking handler kills
/// the watcher and surfaces as [`PipeEvent::Exception`].
pub type EventHandler = Arc<dyn Fn(PipeEvent<'_>) + Send + Sync>;
