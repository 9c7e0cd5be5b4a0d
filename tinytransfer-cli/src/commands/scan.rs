use crate::PacketKind;
use anyhow::{Context, Result};
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read};
use tinytransfer_core::{
    constants::UPDATE_MAX_PAYLOAD_LEN,
    scanner::{scan_stream_with_stats, LocatedPacket, ScanStats},
    DeflateDecoder, RpcPacket, RpcParser, UpdatePacket, UpdateParser,
};
use tracing::{info, warn};

/// A recovered packet in JSON-friendly form
#[derive(Debug, Serialize, Deserialize)]
pub struct RecoveredPacket {
    /// Byte offset of the start of header
    pub offset: usize,
    /// Serialized size in bytes
    pub size: usize,
    /// Packet ID for updates, nonce for RPC calls
    pub id: u32,
    /// Procedure ID (RPC only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proc_id: Option<u16>,
    /// Raw flag bits (updates only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u16>,
    /// Payload or args, decompressed when flagged, as hex
    pub data_hex: String,
    /// Payload or args as lossy UTF-8
    pub data: String,
    /// Log as lossy UTF-8 (updates only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl RecoveredPacket {
    fn from_update(located: &LocatedPacket<UpdatePacket>, decoder: &mut DeflateDecoder) -> Self {
        let packet = &located.packet;
        let mut out = [0u8; UPDATE_MAX_PAYLOAD_LEN];
        let data = match packet.decompress_payload(decoder, &mut out) {
            Ok(n) => out[..n].to_vec(),
            Err(e) => {
                warn!(
                    "Packet {} payload did not decompress ({}); keeping raw bytes",
                    packet.packet_id(),
                    e
                );
                packet.payload().to_vec()
            }
        };

        Self {
            offset: located.offset,
            size: located.size,
            id: packet.packet_id(),
            proc_id: None,
            flags: Some(packet.flags().bits()),
            data_hex: hex::encode(&data),
            data: String::from_utf8_lossy(&data).into_owned(),
            log: Some(String::from_utf8_lossy(packet.log()).into_owned()),
        }
    }

    fn from_rpc(located: &LocatedPacket<RpcPacket>) -> Self {
        let packet = &located.packet;
        Self {
            offset: located.offset,
            size: located.size,
            id: packet.nonce(),
            proc_id: Some(packet.proc_id()),
            flags: None,
            data_hex: hex::encode(packet.args()),
            data: String::from_utf8_lossy(packet.args()).into_owned(),
            log: None,
        }
    }
}

/// Recover every valid packet of `kind` from a captured buffer
pub fn recover(data: &[u8], kind: PacketKind) -> (Vec<RecoveredPacket>, ScanStats) {
    match kind {
        PacketKind::Update => {
            let (located, stats) = scan_stream_with_stats::<UpdateParser>(data);
            let mut decoder = DeflateDecoder::new();
            let recovered = located
                .iter()
                .map(|lp| RecoveredPacket::from_update(lp, &mut decoder))
                .collect();
            (recovered, stats)
        }
        PacketKind::Rpc => {
            let (located, stats) = scan_stream_with_stats::<RpcParser>(data);
            (located.iter().map(RecoveredPacket::from_rpc).collect(), stats)
        }
    }
}

pub fn execute(input: &str, kind: PacketKind, output: Option<&str>, stats_only: bool) -> Result<()> {
    info!("Scanning file: {}", input);

    // Read input file or stdin
    let data = if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        fs::read(input).with_context(|| format!("Failed to read input file: {}", input))?
    };

    info!("File size: {} bytes", data.len());

    let (recovered, stats) = recover(&data, kind);

    println!("\n=== Scan Results ({:?}) ===", kind);
    println!("Bytes scanned:     {} bytes", stats.bytes_scanned);
    println!("SOH matches:       {}", stats.soh_matches);
    if stats.packets_found > 0 {
        println!("Valid packets:     {}", stats.packets_found.to_string().green());
    } else {
        println!("Valid packets:     {}", "0".red());
    }
    println!("Header rejects:    {}", stats.header_rejects);
    println!("Oversized fields:  {}", stats.oversized_fields);
    println!("Checksum failures: {}", stats.payload_checksum_failures);
    println!("Bytes recovered:   {} bytes", stats.bytes_recovered);
    println!("Recovery rate:     {:.2}%", stats.recovery_rate());
    println!();

    if stats_only {
        return Ok(());
    }

    if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&recovered)
            .with_context(|| "Failed to serialize recovered packets")?;

        fs::write(output_path, json)
            .with_context(|| format!("Failed to write output file: {}", output_path))?;

        info!("Recovered packets written to: {}", output_path);
    } else {
        println!("=== Recovered Packets ===");
        for packet in &recovered {
            println!(
                "{} {} @ offset {}: {} bytes",
                "✓".green(),
                packet.id,
                packet.offset,
                packet.size
            );
        }
    }

    Ok(())
}
