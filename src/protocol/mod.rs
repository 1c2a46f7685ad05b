//! Protocol module - wire format and framing codec.
//!
//! This module implements the binary protocol of the transport:
//! - 8-byte packet header encoding/decoding
//! - message serialization into bounded fragments
//! - packet reassembly across arbitrary read fragmentation
//! - message reassembly across start..end packet runs

mod buffer;
mod deserializer;
mod receiver;
mod serializer;
mod wire_format;

pub use buffer::{Buffer, Packet};
pub use deserializer::{Deserializer, Reassembly};
pub use receiver::Receiver;
pub use serializer::Serializer;
pub use wire_format::{
    flags, Header, DEFAULT_BUFFER_SIZE, DEFAULT_LIMIT, HEADER_SIZE, MAX_MESSAGE_SIZE,
    MIN_BUFFER_SIZE,
};
