//! Property-based tests using proptest

use tinytransfer_core::{
    constants::{RPC_MAX_ARGS_LEN, UPDATE_MAX_LOG_LEN, UPDATE_MAX_PAYLOAD_LEN},
    fletcher16,
    scanner::{scan_rpcs, scan_updates},
    DeflateDecoder, DeflateEncoder, RpcPacket, RpcParser, UpdatePacket, UpdateParser,
};
use proptest::prelude::*;
use rand::{rngs::StdRng, RngCore, SeedableRng};

proptest! {
    #[test]
    fn prop_update_round_trip(
        packet_id in any::<u32>(),
        payload in prop::collection::vec(any::<u8>(), 0..=UPDATE_MAX_PAYLOAD_LEN),
        log in prop::collection::vec(any::<u8>(), 0..=UPDATE_MAX_LOG_LEN),
        is_integrator in any::<bool>(),
    ) {
        let packet = UpdatePacket::new(&payload, packet_id, &log, is_integrator).unwrap();
        let wire = packet.to_bytes();

        let (decoded, size) = UpdatePacket::from_bytes(&wire).unwrap();

        prop_assert_eq!(size, wire.len());
        prop_assert_eq!(decoded.packet_id(), packet_id);
        prop_assert_eq!(decoded.payload(), payload.as_slice());
        if is_integrator {
            prop_assert!(decoded.log().is_empty());
        } else {
            prop_assert_eq!(decoded.log(), log.as_slice());
        }
    }

    #[test]
    fn prop_rpc_round_trip(
        nonce in any::<u32>(),
        proc_id in any::<u16>(),
        args in prop::collection::vec(any::<u8>(), 0..=RPC_MAX_ARGS_LEN),
    ) {
        let packet = RpcPacket::new(nonce, proc_id, &args).unwrap();
        let (decoded, size) = RpcPacket::from_bytes(&packet.to_bytes()).unwrap();

        prop_assert_eq!(size, packet.wire_size());
        prop_assert_eq!(decoded, packet);
    }

    #[test]
    fn prop_oversized_input_rejected(extra in 1usize..64) {
        let data = vec![0u8; UPDATE_MAX_PAYLOAD_LEN + extra];
        prop_assert!(UpdatePacket::new(&data, 1, b"", false).is_err());
        prop_assert!(RpcPacket::new(1, 1, &data).is_err());
    }

    #[test]
    fn prop_decode_never_panics(
        data in prop::collection::vec(any::<u8>(), 0..4096)
    ) {
        let _ = UpdatePacket::from_bytes(&data);
        let _ = RpcPacket::from_bytes(&data);
        let _ = RpcPacket::from_raw(&data);
    }

    #[test]
    fn prop_parsers_never_panic(
        data in prop::collection::vec(any::<u8>(), 0..8192)
    ) {
        let mut update = UpdateParser::new();
        let mut rpc = RpcParser::new();
        for &b in &data {
            if let Some(packet) = update.process_byte(b) {
                prop_assert!(packet.is_valid());
            }
            if let Some(packet) = rpc.process_byte(b) {
                prop_assert!(packet.is_valid());
            }
        }
        prop_assert_eq!(update.stats().bytes_processed, data.len() as u64);
    }

    #[test]
    fn prop_packet_found_after_noise(
        noise in prop::collection::vec(any::<u8>(), 0..512),
        payload in prop::collection::vec(any::<u8>(), 0..256),
        packet_id in any::<u32>(),
    ) {
        let packet = UpdatePacket::new(&payload, packet_id, b"", false).unwrap();

        let mut stream = noise.clone();
        stream.extend_from_slice(&packet.to_bytes());

        let mut parser = UpdateParser::new();
        let completions: Vec<(usize, UpdatePacket)> = stream
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| parser.process_byte(b).map(|p| (i, p)))
            .collect();

        prop_assert_eq!(completions.len(), 1);
        prop_assert_eq!(completions[0].0, stream.len() - 1);
        prop_assert_eq!(&completions[0].1, &packet);

        let found = scan_updates(&stream);
        prop_assert_eq!(found.len(), 1);
        prop_assert_eq!(found[0].offset, noise.len());
    }

    #[test]
    fn prop_rpc_found_after_noise(
        noise in prop::collection::vec(any::<u8>(), 0..512),
        args in prop::collection::vec(any::<u8>(), 0..128),
    ) {
        let call = RpcPacket::new(7, 3, &args).unwrap();

        let mut stream = noise.clone();
        stream.extend_from_slice(&call.to_bytes());

        let mut parser = RpcParser::new();
        let completions: Vec<usize> = stream
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| parser.process_byte(b).map(|_| i))
            .collect();
        prop_assert_eq!(completions, vec![stream.len() - 1]);

        let found = scan_rpcs(&stream);
        prop_assert_eq!(found.len(), 1);
        prop_assert_eq!(found[0].offset, noise.len());
        prop_assert_eq!(&found[0].packet, &call);
    }

    #[test]
    fn prop_single_byte_corruption_detected(
        payload in prop::collection::vec(any::<u8>(), 1..256),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let packet = UpdatePacket::new(&payload, 42, b"", false).unwrap();
        let mut wire = packet.to_bytes().to_vec();
        let at = index.index(wire.len());
        // 0x00 and 0xFF are the same value modulo 255
        prop_assume!((wire[at] ^ flip) % 255 != wire[at] % 255);
        wire[at] ^= flip;

        prop_assert!(UpdatePacket::from_bytes(&wire).is_err());
    }

    #[test]
    fn prop_fletcher_detects_single_byte_change(
        data in prop::collection::vec(any::<u8>(), 1..2048),
        index in any::<prop::sample::Index>(),
        delta in 1u8..=254,
    ) {
        let mut changed = data.clone();
        let at = index.index(changed.len());
        // Keep the byte's value mod 255 distinct
        let new = ((changed[at] as u16 % 255 + delta as u16) % 255) as u8;
        changed[at] = new;
        prop_assert_ne!(fletcher16(&data), fletcher16(&changed));
    }

    #[test]
    fn prop_compressed_round_trip(
        payload in prop::collection::vec(0u8..4, 0..=UPDATE_MAX_PAYLOAD_LEN),
    ) {
        let packet = UpdatePacket::new_compressed(
            &mut DeflateEncoder::new(), &payload, 1, b"", false,
        ).unwrap();

        let mut out = [0u8; UPDATE_MAX_PAYLOAD_LEN];
        let n = packet.decompress_payload(&mut DeflateDecoder::new(), &mut out).unwrap();
        prop_assert_eq!(&out[..n], payload.as_slice());
    }
}

#[test]
fn compressed_round_trip_edge_sizes() {
    let mut rng = StdRng::seed_from_u64(1024);

    for size in [0usize, 1, UPDATE_MAX_PAYLOAD_LEN] {
        let patterned: Vec<u8> = (0..size).map(|i| (i % 7) as u8).collect();
        let mut random = vec![0u8; size];
        rng.fill_bytes(&mut random);

        for payload in [patterned, random] {
            let packet =
                UpdatePacket::new_compressed(&mut DeflateEncoder::new(), &payload, 1, b"", false)
                    .unwrap();

            let mut out = [0u8; UPDATE_MAX_PAYLOAD_LEN];
            let n = packet.decompress_payload(&mut DeflateDecoder::new(), &mut out).unwrap();
            assert_eq!(&out[..n], payload.as_slice(), "size {size}");
        }
    }
}
