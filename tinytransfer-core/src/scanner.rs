//! Packet recovery over captured buffers
//!
//! A scan feeds a whole buffer through a fresh [`StreamParser`], so it finds
//! the packets a live receiver would have found on the same bytes. At the end
//! of the buffer the parser is flushed, so a packet swallowed by a torn
//! candidate that never completed is still recovered.

use crate::parser::{RpcParser, StreamParser, UpdateParser};
use crate::rpc::RpcPacket;
use crate::update::UpdatePacket;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use tracing::debug;

/// A packet found at a specific offset in the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedPacket<P> {
    /// Byte offset of the packet's start of header
    pub offset: usize,

    /// Total size of the packet in bytes
    pub size: usize,

    /// The decoded packet
    pub packet: P,
}

/// Scan a byte stream for valid packets, skipping noise and damaged packets
pub fn scan_stream<P: StreamParser>(data: &[u8]) -> Vec<LocatedPacket<P::Packet>> {
    scan_stream_with_stats::<P>(data).0
}

/// Scan a captured buffer for update packets
pub fn scan_updates(data: &[u8]) -> Vec<LocatedPacket<UpdatePacket>> {
    scan_stream::<UpdateParser>(data)
}

/// Scan a captured buffer for RPC packets
pub fn scan_rpcs(data: &[u8]) -> Vec<LocatedPacket<RpcPacket>> {
    scan_stream::<RpcParser>(data)
}

/// Scan statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// Total bytes scanned
    pub bytes_scanned: usize,

    /// Number of valid packets found
    pub packets_found: usize,

    /// Total bytes recovered (sum of all valid packet sizes)
    pub bytes_recovered: usize,

    /// Start-of-header matches, including false ones
    pub soh_matches: u64,

    /// Headers dropped for a bad checksum
    pub header_rejects: u64,

    /// Headers dropped for a size field beyond capacity
    pub oversized_fields: u64,

    /// Packets dropped for a bad payload or args checksum
    pub payload_checksum_failures: u64,
}

impl ScanStats {
    /// Calculate recovery rate as a percentage
    pub fn recovery_rate(&self) -> f64 {
        if self.bytes_scanned == 0 {
            0.0
        } else {
            (self.bytes_recovered as f64 / self.bytes_scanned as f64) * 100.0
        }
    }
}

/// Scan stream with statistics
pub fn scan_stream_with_stats<P: StreamParser>(
    data: &[u8],
) -> (Vec<LocatedPacket<P::Packet>>, ScanStats) {
    let mut parser = P::default();
    let mut results = Vec::new();
    let mut stats = ScanStats {
        bytes_scanned: data.len(),
        ..Default::default()
    };

    #[cfg(feature = "logging")]
    debug!("Starting stream scan of {} bytes", data.len());

    for &byte in data {
        if let Some(packet) = parser.process_byte(byte) {
            results.push(locate(&parser, packet, &mut stats));
        }
    }
    while let Some(packet) = parser.flush() {
        results.push(locate(&parser, packet, &mut stats));
    }

    let parser_stats = parser.stats();
    stats.packets_found = results.len();
    stats.soh_matches = parser_stats.soh_matches;
    stats.header_rejects = parser_stats.header_checksum_failures;
    stats.oversized_fields = parser_stats.oversized_fields;
    stats.payload_checksum_failures = parser_stats.payload_checksum_failures;

    #[cfg(feature = "logging")]
    debug!(
        "Scan complete: found {} valid packets out of {} bytes scanned",
        stats.packets_found, stats.bytes_scanned
    );

    (results, stats)
}

/// Place a packet the parser just returned
fn locate<P: StreamParser>(
    parser: &P,
    packet: P::Packet,
    stats: &mut ScanStats,
) -> LocatedPacket<P::Packet> {
    let size = P::wire_size(&packet);
    // The parser has consumed exactly up to the packet's last byte
    let offset = parser.consumed() as usize - size;

    #[cfg(feature = "logging")]
    debug!("Recovered packet at offset {} ({} bytes)", offset, size);

    stats.bytes_recovered += size;
    LocatedPacket {
        offset,
        size,
        packet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: u32, payload: &[u8]) -> UpdatePacket {
        UpdatePacket::new(payload, id, b"log", false).unwrap()
    }

    #[test]
    fn test_scan_clean_stream() {
        let mut stream = Vec::new();
        for id in 1..=3 {
            stream.extend_from_slice(&update(id, b"packet").to_bytes());
        }

        let results = scan_updates(&stream);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].packet.packet_id(), 1);
        assert_eq!(results[1].packet.packet_id(), 2);
        assert_eq!(results[2].packet.packet_id(), 3);
        assert_eq!(results[0].offset, 0);
        assert_eq!(results[1].offset, results[0].size);
    }

    #[test]
    fn test_scan_with_corruption() {
        let first = update(1, b"packet 1");
        let second = update(2, b"packet 2");

        let mut stream = Vec::new();
        stream.extend_from_slice(&first.to_bytes());
        stream.extend_from_slice(b"GARBAGE DATA HERE!!!");
        let second_offset = stream.len();
        stream.extend_from_slice(&second.to_bytes());

        let results = scan_updates(&stream);

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].packet, second);
        assert_eq!(results[1].offset, second_offset);
    }

    #[test]
    fn test_scan_missing_start() {
        let first = update(1, b"packet 1").to_bytes();
        let second = update(2, b"packet 2").to_bytes();

        let mut stream = Vec::new();
        stream.extend_from_slice(&first);
        stream.extend_from_slice(&second);

        let results = scan_updates(&stream[10..]);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].packet.packet_id(), 2);
        assert_eq!(results[0].offset, first.len() - 10);
    }

    #[test]
    fn test_scan_damaged_packet_skipped() {
        let mut damaged = update(1, b"damaged").to_bytes().to_vec();
        // First payload byte
        damaged[18] ^= 0x01;

        let mut stream = damaged;
        stream.extend_from_slice(&update(2, b"intact").to_bytes());

        let (results, stats) = scan_stream_with_stats::<UpdateParser>(&stream);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].packet.packet_id(), 2);
        assert_eq!(stats.payload_checksum_failures, 1);
    }

    #[test]
    fn test_scan_recovers_packet_after_torn_write() {
        let torn = UpdatePacket::new(&[0x5A; 200], 1, b"", false).unwrap().to_bytes();
        let survivor = UpdatePacket::new(b"survivor", 2, b"", false).unwrap();

        let mut stream = torn[..40].to_vec();
        stream.extend_from_slice(&survivor.to_bytes());
        stream.extend_from_slice(&[0u8; 300]);

        let (results, stats) = scan_stream_with_stats::<UpdateParser>(&stream);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].packet, survivor);
        assert_eq!(results[0].offset, 40);
        assert_eq!(stats.payload_checksum_failures, 1);
    }

    #[test]
    fn test_scan_flushes_torn_candidate_at_end() {
        let torn = UpdatePacket::new(&[0x5A; 200], 1, b"", false).unwrap().to_bytes();
        let survivor = UpdatePacket::new(b"survivor", 2, b"", false).unwrap();

        // Nothing follows the survivor, so only the end-of-buffer flush finds it
        let mut stream = torn[..40].to_vec();
        stream.extend_from_slice(&survivor.to_bytes());

        let results = scan_updates(&stream);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].packet, survivor);
        assert_eq!(results[0].offset, 40);
        assert_eq!(results[0].size, stream.len() - 40);
    }

    #[test]
    fn test_scan_rpc_after_torn_call() {
        let torn = RpcPacket::new(1, 1, &[0x33; 300]).unwrap().to_bytes();
        let call = RpcPacket::new(9, 4, b"go").unwrap();

        let mut stream = torn[..50].to_vec();
        stream.extend_from_slice(&call.to_bytes());
        stream.extend_from_slice(&[0u8; 400]);

        let results = scan_rpcs(&stream);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].packet, call);
        assert_eq!(results[0].offset, 50);
        assert_eq!(scan_rpcs(&stream[..50 + call.wire_size()])[0].offset, 50);
    }

    #[test]
    fn test_scan_rpcs_ignores_updates() {
        let call = RpcPacket::new(9, 4, b"on").unwrap();

        let mut stream = update(1, b"telemetry").to_bytes().to_vec();
        stream.extend_from_slice(&call.to_bytes());

        let results = scan_rpcs(&stream);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].packet, call);
        assert!(scan_updates(&call.to_bytes()).is_empty());
    }

    #[test]
    fn test_scan_stats() {
        let wire = update(1, b"test").to_bytes();

        let (results, stats) = scan_stream_with_stats::<UpdateParser>(&wire);

        assert_eq!(results.len(), 1);
        assert_eq!(stats.packets_found, 1);
        assert_eq!(stats.bytes_scanned, wire.len());
        assert_eq!(stats.soh_matches, 1);
        assert!((stats.recovery_rate() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scan_empty() {
        let (results, stats) = scan_stream_with_stats::<RpcParser>(&[]);
        assert!(results.is_empty());
        assert_eq!(stats.recovery_rate(), 0.0);
    }
}
