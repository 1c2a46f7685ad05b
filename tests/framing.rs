//! Property tests for the framing codec: serializer output fed through the
//! receiver and deserializer survives any split size and any re-chunking of
//! the byte stream.

use pipelink::protocol::{Buffer, Deserializer, Header, Reassembly, Receiver, Serializer};
use proptest::prelude::*;

const POOL_RESERVE: usize = 64;
const TEST_LIMIT: usize = 1 << 20;

/// Serialize a message into contiguous wire bytes.
fn to_wire(message: &[u8], split: usize) -> Vec<u8> {
    let mut wire = Vec::new();
    let mut serializer = Serializer::new(Buffer::new(message), split);
    while let Some((fragment, header)) = serializer.next() {
        wire.extend_from_slice(&header.encode());
        wire.extend_from_slice(fragment.as_slice());
    }
    wire
}

/// Feed wire bytes through receiver + deserializer in the given chunk
/// pattern (cycled until the wire is exhausted), returning the delivered
/// messages.
fn deliver(wire: &[u8], chunk_sizes: &[usize]) -> Vec<Vec<u8>> {
    let mut receiver = Receiver::new(POOL_RESERVE, TEST_LIMIT);
    let mut deserializer = Deserializer::new(POOL_RESERVE, TEST_LIMIT);
    let mut delivered = Vec::new();

    let mut offset = 0;
    let mut pattern = chunk_sizes.iter().cycle();
    while offset < wire.len() {
        let take = (*pattern.next().unwrap()).min(wire.len() - offset);
        receiver
            .feed(&wire[offset..offset + take], |packet| {
                if let Reassembly::Complete(message) = deserializer.feed(packet)? {
                    delivered.push(message.to_vec());
                }
                Ok(())
            })
            .unwrap();
        offset += take;
    }
    delivered
}

/// Collect the packet sequence (header + payload) a receiver produces for
/// the given chunk pattern.
fn packet_sequence(wire: &[u8], chunk_sizes: &[usize]) -> Vec<(Header, Vec<u8>)> {
    let mut receiver = Receiver::new(POOL_RESERVE, TEST_LIMIT);
    let mut packets = Vec::new();

    let mut offset = 0;
    let mut pattern = chunk_sizes.iter().cycle();
    while offset < wire.len() {
        let take = (*pattern.next().unwrap()).min(wire.len() - offset);
        receiver
            .feed(&wire[offset..offset + take], |packet| {
                packets.push((packet.header, packet.payload.to_vec()));
                Ok(())
            })
            .unwrap();
        offset += take;
    }
    packets
}

proptest! {
    /// Every non-empty message round-trips to exactly one identical
    /// delivery, whatever the split size and however the wire is chunked.
    #[test]
    fn prop_roundtrip_single_message(
        message in prop::collection::vec(any::<u8>(), 1..2048),
        split in 1usize..600,
        chunk_sizes in prop::collection::vec(1usize..64, 1..16),
    ) {
        let wire = to_wire(&message, split);
        let delivered = deliver(&wire, &chunk_sizes);
        prop_assert_eq!(delivered.len(), 1);
        prop_assert_eq!(&delivered[0], &message);
    }

    /// The receiver yields the same packet sequence for any chunking of the
    /// same wire bytes.
    #[test]
    fn prop_fragmentation_agnostic(
        message in prop::collection::vec(any::<u8>(), 1..1024),
        split in 1usize..300,
        chunk_sizes in prop::collection::vec(1usize..48, 1..16),
    ) {
        let wire = to_wire(&message, split);
        let whole = packet_sequence(&wire, &[wire.len()]);
        let chunked = packet_sequence(&wire, &chunk_sizes);
        prop_assert_eq!(whole, chunked);
    }

    /// A cancel packet anywhere inside a run discards it; the following run
    /// delivers intact.
    #[test]
    fn prop_cancel_discards_run(
        first in prop::collection::vec(any::<u8>(), 2..512),
        second in prop::collection::vec(any::<u8>(), 1..512),
        split in 1usize..128,
        cut in any::<prop::sample::Index>(),
        chunk_sizes in prop::collection::vec(1usize..32, 1..8),
    ) {
        // Keep a proper prefix of the first run (at least the start packet,
        // never the end packet), then cancel, then send the second message.
        let mut fragments = Vec::new();
        let mut serializer = Serializer::new(Buffer::new(&first), split);
        while let Some((fragment, header)) = serializer.next() {
            let mut bytes = header.encode().to_vec();
            bytes.extend_from_slice(fragment.as_slice());
            fragments.push(bytes);
        }
        let keep = if fragments.len() == 1 {
            // Single-packet message: nothing to truncate, the cancel lands
            // between runs and must still be harmless.
            0
        } else {
            1 + cut.index(fragments.len() - 1)
        };

        let mut wire = Vec::new();
        for fragment in &fragments[..keep] {
            wire.extend_from_slice(fragment);
        }
        wire.extend_from_slice(&Header::cancel().encode());
        wire.extend_from_slice(&to_wire(&second, split));

        let delivered = deliver(&wire, &chunk_sizes);
        prop_assert_eq!(delivered.len(), 1);
        prop_assert_eq!(&delivered[0], &second);
    }

    /// Back-to-back messages on one wire deliver in order, byte for byte.
    #[test]
    fn prop_order_preserved_across_messages(
        messages in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..256), 1..8),
        split in 1usize..100,
        chunk_sizes in prop::collection::vec(1usize..48, 1..8),
    ) {
        let mut wire = Vec::new();
        for message in &messages {
            wire.extend_from_slice(&to_wire(message, split));
        }
        let delivered = deliver(&wire, &chunk_sizes);
        prop_assert_eq!(delivered, messages);
    }
}

#[test]
fn empty_message_produces_no_packets() {
    let wire = to_wire(b"", 16);
    assert!(wire.is_empty());
    assert!(deliver(&wire, &[1]).is_empty());
}
