//! Fixed wire vectors
//!
//! Each vector pins the exact bytes a packet serializes to, and checks that
//! the strict decoder and the stream parsers accept them.

use tinytransfer_core::{
    constants::UpdateFlags, fletcher16, scanner::scan_stream_with_stats, PacketError, RpcPacket,
    RpcParser, UpdatePacket, UpdateParser,
};

fn unhex(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

#[test]
fn vector_fletcher16() {
    assert_eq!(fletcher16(b""), 0x0000);
    assert_eq!(fletcher16(b"abcde"), 0xC8F0);
    assert_eq!(fletcher16(b"abcdef"), 0x2057);
    assert_eq!(fletcher16(b"abcdefgh"), 0x0627);
    assert_eq!(fletcher16(&[0x01, 0x02, 0x03]), 0x0A06);
    // 0xFF is congruent to zero
    assert_eq!(fletcher16(&[0xFF; 6000]), 0x0000);
}

/// 1. Three byte payload, no log
#[test]
fn vector_update_minimal() {
    let expected = unhex("4d444c4e0700000000000300060a00004697010203");

    let packet = UpdatePacket::new(&[0x01, 0x02, 0x03], 7, &[], false).unwrap();
    assert_eq!(packet.to_bytes().as_ref(), expected.as_slice());
    assert_eq!(packet.header_checksum(), 0x9746);

    let (decoded, size) = UpdatePacket::from_bytes(&expected).unwrap();
    assert_eq!(size, 21);
    assert_eq!(decoded, packet);
}

/// 2. Integrator packet: flag bit 1 set, log dropped
#[test]
fn vector_update_integrator() {
    let expected = unhex("4d444c4e0403020102000200d13a0000467b6869");

    let packet = UpdatePacket::new(b"hi", 0x0102_0304, b"ignored log", true).unwrap();
    assert_eq!(packet.to_bytes().as_ref(), expected.as_slice());
    assert_eq!(packet.flags(), UpdateFlags::new(UpdateFlags::INTEGRATOR));
    assert!(packet.log().is_empty());
}

/// 3. Log only, empty payload
#[test]
fn vector_update_log_only() {
    let expected = unhex("4d444c4e010000000000000000000400310f6c6f6721");

    let packet = UpdatePacket::new(&[], 1, b"log!", false).unwrap();
    assert_eq!(packet.to_bytes().as_ref(), expected.as_slice());

    let (found, stats) = scan_stream_with_stats::<UpdateParser>(&expected);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].packet.log(), b"log!");
    assert_eq!(stats.bytes_recovered, expected.len());
}

/// 4. RPC call with two args bytes
#[test]
fn vector_rpc_call() {
    let expected = unhex("4e4d454901000000050002006611a9a8aabb");

    let packet = RpcPacket::new(1, 5, &[0xAA, 0xBB]).unwrap();
    assert_eq!(packet.to_bytes().as_ref(), expected.as_slice());
    assert_eq!(packet.header().args_checksum, 0x1166);
    assert_eq!(packet.header_checksum(), 0xA8A9);

    let (found, _) = scan_stream_with_stats::<RpcParser>(&expected);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].packet, packet);
}

/// 5. RPC call without args
#[test]
fn vector_rpc_no_args() {
    let expected = unhex("4e4d4549efbeaddeffff000000006534");

    let packet = RpcPacket::new(0xDEAD_BEEF, 0xFFFF, &[]).unwrap();
    assert_eq!(packet.to_bytes().as_ref(), expected.as_slice());
}

/// 6. Swapped header checksum bytes are rejected everywhere
#[test]
fn vector_wrong_header_checksum() {
    let damaged = unhex("4d444c4e0700000000000300060a00009746010203");

    assert!(matches!(
        UpdatePacket::from_bytes(&damaged),
        Err(PacketError::HeaderChecksumMismatch {
            expected: 0x4697,
            actual: 0x9746
        })
    ));

    let (found, stats) = scan_stream_with_stats::<UpdateParser>(&damaged);
    assert!(found.is_empty());
    assert_eq!(stats.header_rejects, 1);
}

/// 7. Truncated packet
#[test]
fn vector_truncated() {
    let truncated = unhex("4d444c4e0700000000000300060a000046970102");

    assert!(matches!(
        UpdatePacket::from_bytes(&truncated),
        Err(PacketError::IncompletePacket {
            expected: 21,
            actual: 20
        })
    ));
    assert!(scan_stream_with_stats::<UpdateParser>(&truncated).0.is_empty());
}

/// 8. Payload byte changed after the header was sealed
#[test]
fn vector_payload_bit_flip() {
    let damaged = unhex("4d444c4e0700000000000300060a00004697010303");

    assert!(matches!(
        UpdatePacket::from_bytes(&damaged),
        Err(PacketError::PayloadChecksumMismatch {
            expected: 0x0A06,
            ..
        })
    ));

    let (found, stats) = scan_stream_with_stats::<UpdateParser>(&damaged);
    assert!(found.is_empty());
    assert_eq!(stats.payload_checksum_failures, 1);
}
