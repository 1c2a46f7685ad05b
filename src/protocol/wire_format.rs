//! Wire format encoding and decoding.
//!
//! Implements the 8-byte packet header:
//! ```text
//! ┌───────────┬─────────────┬──────────┬─────────────────────┐
//! │ Size      │ Data offset │ Flags    │ Payload             │
//! │ 4 bytes   │ 2 bytes     │ 2 bytes  │ size − offset bytes │
//! │ u32 LE    │ u16 LE      │ u16 LE   │                     │
//! └───────────┴─────────────┴──────────┴─────────────────────┘
//! ```
//!
//! `size` counts the whole packet including the header. `data_offset` is the
//! byte offset of the payload from the start of the header (equal to
//! [`HEADER_SIZE`] in this version). All multi-byte integers are Little
//! Endian.
//!
//! A message is carried by a run of packets: the first has the `start` flag,
//! the last has `end`, and a single-packet message has both. A `cancel`
//! packet is header-only and voids the sender's in-progress run.

use crate::error::{PipeError, Result};

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Maximum message size a packet run can describe (`u32::MAX` minus one
/// header).
pub const MAX_MESSAGE_SIZE: usize = u32::MAX as usize - HEADER_SIZE;

/// Default maximum reassembled message size (1 GB).
pub const DEFAULT_LIMIT: usize = 1_073_741_824;

/// Default per-direction pipe buffer and write split size (64 KB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Smallest usable pipe buffer: a header plus a minimal payload token.
pub const MIN_BUFFER_SIZE: usize = 40;

/// Flag constants for the packet header.
pub mod flags {
    /// First packet of a message.
    pub const START: u16 = 0b0000_0001;
    /// Last packet of a message.
    pub const END: u16 = 0b0000_0010;
    /// Header-only packet voiding the sender's in-progress message.
    pub const CANCEL: u16 = 0b0000_0100;

    /// Reserved bits mask (bits 3-15, must be zero).
    pub const RESERVED_MASK: u16 = !(START | END | CANCEL);

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u16, flag: u16) -> bool {
        flags & flag != 0
    }
}

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total packet length in bytes, including this header.
    pub size: u32,
    /// Byte offset from the header start to the payload.
    pub data_offset: u16,
    /// Flags word (see the [`flags`] module).
    pub flags: u16,
}

impl Header {
    /// Create a header for a data packet carrying `data_size` payload bytes.
    pub fn data(data_size: u32, start: bool, end: bool) -> Self {
        let mut flags = 0u16;
        if start {
            flags |= flags::START;
        }
        if end {
            flags |= flags::END;
        }
        Self {
            size: HEADER_SIZE as u32 + data_size,
            data_offset: HEADER_SIZE as u16,
            flags,
        }
    }

    /// Create a header-only cancel packet.
    pub fn cancel() -> Self {
        Self {
            size: HEADER_SIZE as u32,
            data_offset: HEADER_SIZE as u16,
            flags: flags::CANCEL,
        }
    }

    /// Payload length in bytes.
    #[inline]
    pub fn data_size(&self) -> u32 {
        self.size - u32::from(self.data_offset)
    }

    /// Check if this packet opens a message.
    #[inline]
    pub fn is_start(&self) -> bool {
        flags::has_flag(self.flags, flags::START)
    }

    /// Check if this packet closes a message.
    #[inline]
    pub fn is_end(&self) -> bool {
        flags::has_flag(self.flags, flags::END)
    }

    /// Check if this is a cancel packet.
    #[inline]
    pub fn is_cancel(&self) -> bool {
        flags::has_flag(self.flags, flags::CANCEL)
    }

    /// Encode the header to bytes (Little Endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode the header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than [`HEADER_SIZE`].
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&self.size.to_le_bytes());
        buf[4..6].copy_from_slice(&self.data_offset.to_le_bytes());
        buf[6..8].copy_from_slice(&self.flags.to_le_bytes());
    }

    /// Decode a header from bytes (Little Endian).
    ///
    /// Returns `None` if the buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            size: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            data_offset: u16::from_le_bytes([buf[4], buf[5]]),
            flags: u16::from_le_bytes([buf[6], buf[7]]),
        })
    }

    /// Validate structural invariants against the reassembly `limit`.
    ///
    /// Checks:
    /// - `size` covers at least the header
    /// - the payload starts at or after the header end
    /// - the payload fits inside `size`
    /// - the payload does not exceed `limit`
    pub fn validate(&self, limit: usize) -> Result<()> {
        if (self.size as usize) < HEADER_SIZE {
            return Err(PipeError::Length(format!(
                "packet size {} is smaller than the header",
                self.size
            )));
        }
        if usize::from(self.data_offset) < HEADER_SIZE {
            return Err(PipeError::Length(format!(
                "data offset {} is inside the header",
                self.data_offset
            )));
        }
        if u32::from(self.data_offset) > self.size {
            return Err(PipeError::Length(format!(
                "data offset {} exceeds packet size {}",
                self.data_offset, self.size
            )));
        }
        if self.data_size() as usize > limit {
            return Err(PipeError::Length(format!(
                "payload size {} exceeds limit {}",
                self.data_size(),
                limit
            )));
        }
        Ok(())
    }
}
