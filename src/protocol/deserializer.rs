//! Message reassembly from packet runs.
//!
//! The deserializer concatenates the payloads of one start..end packet run
//! into a single message, accumulated in a `bytes::BytesMut` pool whose
//! capacity survives across runs. A cancel packet discards the run in
//! progress; a start packet always begins a fresh run.

use bytes::BytesMut;

use super::buffer::Packet;
use crate::error::{PipeError, Result};

/// Outcome of feeding one packet.
#[derive(Debug, PartialEq, Eq)]
pub enum Reassembly<'a> {
    /// More packets of the current run are expected.
    Incomplete,
    /// The sender voided the run in progress; nothing is delivered.
    Cancelled,
    /// A message completed. The view borrows the deserializer pool and is
    /// valid until the next feed.
    Complete(&'a [u8]),
}

/// Accumulates packet payloads across a start..end run.
pub struct Deserializer {
    expecting_start: bool,
    pool: BytesMut,
    /// Maximum accepted total message size.
    limit: usize,
}

impl Deserializer {
    /// Create a deserializer with `reserve` bytes of pool capacity and the
    /// given total message `limit`.
    pub fn new(reserve: usize, limit: usize) -> Self {
        Self {
            expecting_start: true,
            pool: BytesMut::with_capacity(reserve),
            limit,
        }
    }

    /// Feed one packet.
    ///
    /// Fails with a protocol error when a non-start data packet arrives
    /// while a run is not in progress, and with a length error when the
    /// accumulated message exceeds the limit.
    pub fn feed(&mut self, packet: Packet<'_>) -> Result<Reassembly<'_>> {
        if packet.header.is_cancel() {
            self.pool.clear();
            self.expecting_start = true;
            return Ok(Reassembly::Cancelled);
        }
        if packet.header.is_start() {
            // A start packet always begins a fresh run, even when the
            // previous one never completed.
            self.pool.clear();
            self.expecting_start = false;
        } else if self.expecting_start {
            return Err(PipeError::Protocol(
                "continuation packet received outside a message run".into(),
            ));
        }
        self.pool.extend_from_slice(packet.payload);
        if self.pool.len() > self.limit {
            return Err(PipeError::Length(format!(
                "reassembled message size {} exceeds limit {}",
                self.pool.len(),
                self.limit
            )));
        }
        if packet.header.is_end() {
            self.expecting_start = true;
            return Ok(Reassembly::Complete(&self.pool[..]));
        }
        Ok(Reassembly::Incomplete)
    }

    /// Discard any run in progress, keeping the pool capacity.
    pub fn reset(&mut self) {
        self.pool.clear();
        self.expecting_start = true;
    }
}

impl std::fmt::Debug for Deserializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deserializer")
            .field("expecting_start", &self.expecting_start)
            .field("pooled", &self.pool.len())
            .field("limit", &self.limit)
            .finish()
    }
}
