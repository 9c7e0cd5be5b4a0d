//! Fuzz entry points for tinytransfer-core
//!
//! Each target must hold for arbitrary input. To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Wire a target to one of these functions and run `cargo fuzz run <target>`

use tinytransfer_core::{
    constants::UPDATE_MAX_PAYLOAD_LEN, DeflateDecoder, RpcPacket, RpcParser, StreamParser,
    UpdatePacket, UpdateParser,
};

/// Strict decoders must never panic
pub fn fuzz_decode(data: &[u8]) {
    if let Ok((packet, size)) = UpdatePacket::from_bytes(data) {
        assert_eq!(size, packet.wire_size());
        assert_eq!(&data[..size], packet.to_bytes().as_ref());

        let mut out = [0u8; UPDATE_MAX_PAYLOAD_LEN];
        let _ = packet.decompress_payload(&mut DeflateDecoder::new(), &mut out);
    }

    if let Ok((packet, size)) = RpcPacket::from_bytes(data) {
        assert_eq!(&data[..size], packet.to_bytes().as_ref());
    }
}

fn fuzz_parser<P>(data: &[u8], is_valid: impl Fn(&P::Packet) -> bool)
where
    P: StreamParser,
{
    let mut parser = P::default();
    for &byte in data {
        if let Some(packet) = parser.process_byte(byte) {
            assert!(is_valid(&packet), "parser returned an invalid packet");
        }
    }
    while let Some(packet) = parser.flush() {
        assert!(is_valid(&packet), "flush returned an invalid packet");
    }
    assert_eq!(parser.stats().bytes_processed, data.len() as u64);
}

/// The update parser never panics and only returns valid packets
pub fn fuzz_update_parser(data: &[u8]) {
    fuzz_parser::<UpdateParser>(data, UpdatePacket::is_valid);
}

/// The RPC parser never panics and only returns valid packets
pub fn fuzz_rpc_parser(data: &[u8]) {
    fuzz_parser::<RpcParser>(data, RpcPacket::is_valid);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzz_decode_empty() {
        fuzz_decode(&[]);
    }

    #[test]
    fn test_fuzz_decode_random() {
        fuzz_decode(&[0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_fuzz_decode_valid() {
        let packet = UpdatePacket::new(b"fuzz", 1, b"seed", false).unwrap();
        fuzz_decode(&packet.to_bytes());
    }

    #[test]
    fn test_fuzz_parsers_noise() {
        fuzz_update_parser(&[0xFF; 1024]);
        fuzz_rpc_parser(&[0x4E, 0x4D, 0x45, 0x49, 0xFF, 0xFF, 0x00]);
    }

    #[test]
    fn test_fuzz_parsers_soh_runs() {
        let data: Vec<u8> = [0x4D, 0x44, 0x4C, 0x4E, 0x4E, 0x4D, 0x45, 0x49]
            .iter()
            .copied()
            .cycle()
            .take(4096)
            .collect();
        fuzz_update_parser(&data);
        fuzz_rpc_parser(&data);
    }
}
