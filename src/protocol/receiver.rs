//! Packet reassembly from an arbitrarily fragmented byte stream.
//!
//! The pipe delivers reads at whatever boundaries the OS buffer produced: a
//! read may end in the middle of a header, in the middle of a body, or cover
//! several whole packets. The receiver rebuilds whole packets with a
//! three-state machine:
//!
//! - `Idle`: positioned at a packet boundary. Packets fully contained in the
//!   input are emitted in place, without copying.
//! - `AwaitingHeader`: the read ended inside a header; the prefix sits in the
//!   pool until the header length is known.
//! - `AwaitingBody`: the header is known but the body is short by
//!   `remaining` bytes; the pool accumulates until the packet is whole.
//!
//! Uses `bytes::BytesMut` for the spill pool: a single buffer reused across
//! packets, its capacity reserved at construction so the steady state does
//! not reallocate. Packets that land whole inside one read are emitted in
//! place and never touch the pool.

use bytes::BytesMut;

use super::buffer::{Buffer, Packet};
use super::wire_format::{Header, HEADER_SIZE};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// At a packet boundary.
    Idle,
    /// A header prefix shorter than [`HEADER_SIZE`] sits in the pool.
    AwaitingHeader,
    /// The packet in the pool is short by `remaining` body bytes.
    AwaitingBody { remaining: usize },
}

/// Reassembles whole packets from a stream of raw pipe reads.
pub struct Receiver {
    state: State,
    /// Spill buffer for packets that cross read boundaries.
    pool: BytesMut,
    /// Maximum accepted payload size per packet.
    limit: usize,
}

impl Receiver {
    /// Create a receiver with `reserve` bytes of pool capacity and the given
    /// per-packet payload `limit`.
    pub fn new(reserve: usize, limit: usize) -> Self {
        Self {
            state: State::Idle,
            pool: BytesMut::with_capacity(reserve),
            limit,
        }
    }

    /// Feed raw bytes, invoking `on_packet` for every completed packet.
    ///
    /// Packet views borrow either the input or the pool and are valid only
    /// for the duration of the callback. An error from the callback aborts
    /// the feed; a malformed header fails with a length error.
    pub fn feed<F>(&mut self, bytes: &[u8], mut on_packet: F) -> Result<()>
    where
        F: FnMut(Packet<'_>) -> Result<()>,
    {
        let mut buf = Buffer::new(bytes);
        while !buf.is_empty() {
            match self.state {
                State::Idle => {
                    if buf.len() < HEADER_SIZE {
                        // Header split across reads.
                        let prefix = buf.consume(buf.len())?;
                        self.pool.clear();
                        self.pool.extend_from_slice(prefix.as_slice());
                        self.state = State::AwaitingHeader;
                        continue;
                    }
                    let header = Header::decode(buf.as_slice()).expect("header bytes available");
                    header.validate(self.limit)?;
                    let size = header.size as usize;
                    if size > buf.len() {
                        // Body split across reads.
                        let taken = buf.len();
                        let prefix = buf.consume(taken)?;
                        self.pool.clear();
                        self.pool.extend_from_slice(prefix.as_slice());
                        self.state = State::AwaitingBody {
                            remaining: size - taken,
                        };
                        continue;
                    }
                    // Whole packet in place.
                    let region = buf.consume(size)?;
                    on_packet(Packet::parse(region.as_slice())?)?;
                }
                State::AwaitingHeader => {
                    let prior = self.pool.len();
                    self.pool.extend_from_slice(buf.as_slice());
                    if self.pool.len() < HEADER_SIZE {
                        buf.consume(buf.len())?;
                        continue;
                    }
                    let header = Header::decode(&self.pool[..]).expect("header bytes available");
                    header.validate(self.limit)?;
                    let size = header.size as usize;
                    // Bytes of this packet not yet taken from the input.
                    let needed = size - prior;
                    if needed > buf.len() {
                        let taken = buf.len();
                        buf.consume(taken)?;
                        self.state = State::AwaitingBody {
                            remaining: needed - taken,
                        };
                        continue;
                    }
                    buf.consume(needed)?;
                    // The pool may hold bytes past `size`; they were also
                    // left in the input and will be re-read from there.
                    on_packet(Packet::parse(&self.pool[..size])?)?;
                    self.state = State::Idle;
                }
                State::AwaitingBody { remaining } => {
                    let take = remaining.min(buf.len());
                    let chunk = buf.consume(take)?;
                    self.pool.extend_from_slice(chunk.as_slice());
                    if take == remaining {
                        on_packet(Packet::parse(&self.pool[..])?)?;
                        self.state = State::Idle;
                    } else {
                        self.state = State::AwaitingBody {
                            remaining: remaining - take,
                        };
                    }
                }
            }
        }
        Ok(())
    }

    /// Return to the packet-boundary state, keeping the pool capacity.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.pool.clear();
    }
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("state", &self.state)
            .field("pooled", &self.pool.len())
            .field("limit", &self.limit)
            .finish()
    }
}
