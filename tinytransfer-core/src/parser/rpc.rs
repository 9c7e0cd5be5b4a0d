//! RPC packet framing

use super::PacketKind;
use crate::constants::{RPC_HEADER_SIZE, RPC_MAX_PACKET_SIZE, RPC_SOH};
use crate::error::PacketError;
use crate::rpc::RpcPacket;
use crate::types::RpcHeader;

/// RPC packets: 14-byte header, then the args section. No log.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcKind;

impl PacketKind for RpcKind {
    type Header = RpcHeader;
    type Packet = RpcPacket;

    const SOH: u32 = RPC_SOH;
    const HEADER_SIZE: usize = RPC_HEADER_SIZE;
    const MAX_PACKET_SIZE: usize = RPC_MAX_PACKET_SIZE;
    const NAME: &'static str = "RPC";

    fn empty() -> RpcPacket {
        RpcPacket::empty()
    }

    fn decode_header(bytes: &[u8]) -> RpcHeader {
        let mut raw = [0u8; RPC_HEADER_SIZE];
        raw.copy_from_slice(bytes);
        RpcHeader::from_bytes(&raw)
    }

    fn check_sizes(header: &RpcHeader) -> Result<(), PacketError> {
        header.check_sizes()
    }

    fn id(header: &RpcHeader) -> u32 {
        header.nonce
    }

    fn body_lens(header: &RpcHeader) -> [usize; 2] {
        [header.args_length as usize, 0]
    }

    fn set_header(packet: &mut RpcPacket, header: RpcHeader, checksum: u16) {
        packet.header = header;
        packet.header_checksum = checksum;
    }

    fn section(packet: &RpcPacket, index: usize) -> &[u8] {
        match index {
            0 => &packet.args,
            _ => &[],
        }
    }

    fn section_mut(packet: &mut RpcPacket, index: usize) -> &mut [u8] {
        match index {
            0 => &mut packet.args,
            _ => &mut [],
        }
    }

    fn validate(packet: &RpcPacket) -> Result<(), PacketError> {
        packet.validate()
    }

    fn wire_size(packet: &RpcPacket) -> usize {
        packet.wire_size()
    }
}

#[cfg(test)]
mod tests {
    use crate::constants::{RPC_MAX_ARGS_LEN, RPC_SOH, UPDATE_SOH};
    use crate::parser::{ParserState, RpcParser};
    use crate::rpc::RpcPacket;
    use crate::types::RpcHeader;
    use crate::update::UpdatePacket;

    fn feed(parser: &mut RpcParser, bytes: &[u8]) -> Vec<(usize, RpcPacket)> {
        bytes
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| parser.process_byte(b).map(|p| (i, p)))
            .collect()
    }

    #[test]
    fn test_parse_call() {
        let packet = RpcPacket::new(0x1234, 7, b"\x01\x02\x03").unwrap();
        let wire = packet.to_bytes();

        let mut parser = RpcParser::new();
        let found = feed(&mut parser, &wire);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, wire.len() - 1);
        assert_eq!(found[0].1.proc_id(), 7);
        assert_eq!(found[0].1.args(), b"\x01\x02\x03");
    }

    #[test]
    fn test_parse_call_without_args() {
        let packet = RpcPacket::new(1, 2, &[]).unwrap();
        let mut parser = RpcParser::new();
        let found = feed(&mut parser, &packet.to_bytes());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, 15);
    }

    #[test]
    fn test_ignores_update_packets() {
        let update = UpdatePacket::new(b"not a call", 1, b"", false).unwrap();
        let call = RpcPacket::new(5, 5, b"go").unwrap();

        let mut stream = update.to_bytes().to_vec();
        stream.extend_from_slice(&call.to_bytes());
        assert_ne!(UPDATE_SOH, RPC_SOH);

        let mut parser = RpcParser::new();
        let found = feed(&mut parser, &stream);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, call);
    }

    #[test]
    fn test_oversized_args_rejected() {
        let header = RpcHeader {
            args_length: RPC_MAX_ARGS_LEN as u16 + 1,
            ..Default::default()
        };
        let mut stream = header.to_bytes().to_vec();
        stream.extend_from_slice(&header.checksum().to_le_bytes());
        stream.extend_from_slice(&[0u8; 32]);

        let mut parser = RpcParser::new();
        assert!(feed(&mut parser, &stream).is_empty());
        assert_eq!(parser.stats().oversized_fields, 1);
        assert_eq!(parser.state(), ParserState::SeekSoh);
    }

    #[test]
    fn test_bad_args_checksum_dropped() {
        let packet = RpcPacket::new(3, 3, b"abcd").unwrap();
        let mut wire = packet.to_bytes().to_vec();
        wire[17] ^= 0xFF;

        let mut parser = RpcParser::new();
        assert!(feed(&mut parser, &wire).is_empty());
        assert_eq!(parser.stats().payload_checksum_failures, 1);
    }

    #[test]
    fn test_call_inside_torn_args_recovered() {
        let torn = RpcPacket::new(1, 1, &[0x33; 300]).unwrap().to_bytes();
        let call = RpcPacket::new(9, 4, b"go").unwrap();

        let mut stream = torn[..50].to_vec();
        stream.extend_from_slice(&call.to_bytes());
        stream.extend_from_slice(&[0u8; 400]);

        let mut parser = RpcParser::new();
        let found = feed(&mut parser, &stream);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, call);
        assert_eq!(found[0].0, 16 + 300 - 1);
        assert_eq!(parser.stats().payload_checksum_failures, 1);
    }

    #[test]
    fn test_false_soh_replayed() {
        let call = RpcPacket::new(42, 1, b"x").unwrap();
        let mut stream = vec![0x4E, 0x4D, 0x45, 0x49, 0xAA];
        stream.extend_from_slice(&call.to_bytes());

        let mut parser = RpcParser::new();
        let found = feed(&mut parser, &stream);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.nonce(), 42);
        assert_eq!(parser.stats().header_checksum_failures, 1);
    }
}
