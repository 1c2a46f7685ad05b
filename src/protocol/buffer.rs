//! Non-owning byte cursors over received data.
//!
//! [`Buffer`] is a read-only view that is consumed front-to-back; it never
//! owns the bytes it describes and is only passed down the call stack.
//! [`Packet`] is a decoded view over one complete packet region.

use super::wire_format::Header;
use crate::error::{PipeError, Result};

/// A non-owning cursor over a contiguous read-only byte region.
#[derive(Debug, Clone, Copy)]
pub struct Buffer<'a> {
    data: &'a [u8],
}

impl<'a> Buffer<'a> {
    /// Create a view over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Remaining length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the view is exhausted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The remaining bytes.
    #[inline]
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Advance past the next `n` bytes and return a view of the skipped
    /// region.
    pub fn consume(&mut self, n: usize) -> Result<Buffer<'a>> {
        if n > self.data.len() {
            return Err(PipeError::Length(format!(
                "cannot consume {} bytes from a {}-byte buffer",
                n,
                self.data.len()
            )));
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Ok(Buffer { data: head })
    }
}

/// A decoded view over one complete packet: header plus payload slice.
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    /// The packet header.
    pub header: Header,
    /// The payload bytes (`size − data_offset` of them).
    pub payload: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Parse a packet from a region holding exactly one whole packet.
    ///
    /// The region must start at the header and extend at least to
    /// `header.size`; the payload is sliced at `data_offset..size`.
    pub fn parse(region: &'a [u8]) -> Result<Self> {
        let header = Header::decode(region).ok_or_else(|| {
            PipeError::Length(format!(
                "packet region of {} bytes is smaller than the header",
                region.len()
            ))
        })?;
        let size = header.size as usize;
        let offset = usize::from(header.data_offset);
        if size > region.len() || offset > size {
            return Err(PipeError::Length(format!(
                "packet of size {} does not fit its {}-byte region",
                header.size,
                region.len()
            )));
        }
        Ok(Self {
            header,
            payload: &region[offset..size],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire_format::HEADER_SIZE;

    #[test]
    fn test_buffer_accessors() {
        let data = b"hello";
        let buffer = Buffer::new(data);
        assert_eq!(buffer.len(), 5);
        assert!(!buffer.is_empty());
        assert_eq!(buffer.as_slice(), b"hello");

        let empty = Buffer::new(b"");
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
    }

    #[test]
    fn test_consume_advances_and_returns_skipped() {
        let data = b"hello world";
        let mut buffer = Buffer::new(data);

        let head = buffer.consume(5).unwrap();
        assert_eq!(head.as_slice(), b"hello");
        assert_eq!(buffer.as_slice(), b" world");

        let rest = buffer.consume(buffer.len()).unwrap();
        assert_eq!(rest.as_slice(), b" world");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_consume_zero() {
        let mut buffer = Buffer::new(b"abc");
        let none = buffer.consume(0).unwrap();
        assert!(none.is_empty());
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_consume_past_end_fails() {
        let mut buffer = Buffer::new(b"abc");
        let result = buffer.consume(4);
        assert!(matches!(result, Err(PipeError::Length(_))));
        // The failed consume leaves the view untouched.
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_packet_parse() {
        let header = Header::data(5, true, true);
        let mut region = header.encode().to_vec();
        region.extend_from_slice(b"hello");

        let packet = Packet::parse(&region).unwrap();
        assert_eq!(packet.header, header);
        assert_eq!(packet.payload, b"hello");
    }

    #[test]
    fn test_packet_parse_clamps_to_size() {
        // Trailing bytes past `size` belong to the next packet.
        let header = Header::data(3, true, true);
        let mut region = header.encode().to_vec();
        region.extend_from_slice(b"abcXYZ");

        let packet = Packet::parse(&region).unwrap();
        assert_eq!(packet.payload, b"abc");
    }

    #[test]
    fn test_packet_parse_short_region_fails() {
        let header = Header::data(100, true, true);
        let mut region = header.encode().to_vec();
        region.extend_from_slice(b"short");
        assert!(Packet::parse(&region).is_err());

        assert!(Packet::parse(&[0u8; HEADER_SIZE - 1]).is_err());
    }
}
