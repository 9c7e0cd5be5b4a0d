use anyhow::{Context, Result};
use bytes::Bytes;
use serde_json::Value;
use std::fs;
use tinytransfer_core::UpdatePacketBuilder;
use tracing::info;

/// Settings applied to every packet of a pack run
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    /// Compress payloads with raw DEFLATE
    pub compress: bool,
    /// Mark packets as integrator-sourced; their log is dropped
    pub integrator: bool,
    /// Packet ID of the first packet
    pub start_id: u32,
    /// Log text attached to every packet
    pub log: Option<String>,
}

/// Pack a JSON array into concatenated update packets.
///
/// Returns the number of packets written.
pub fn execute(input: &str, output: &str, options: &PackOptions) -> Result<usize> {
    info!("Packing data from {} to {}", input, output);

    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input))?;

    let payloads: Vec<Value> =
        serde_json::from_str(&content).with_context(|| "Failed to parse JSON input")?;

    info!("Found {} payloads to pack", payloads.len());

    let log = Bytes::from(options.log.clone().unwrap_or_default());
    let mut output_data = Vec::new();

    for (i, payload) in payloads.iter().enumerate() {
        let packet_id = options.start_id.wrapping_add(i as u32);

        let payload_bytes = serde_json::to_vec(payload)
            .with_context(|| format!("Failed to serialize payload {}", packet_id))?;

        let mut builder = UpdatePacketBuilder::new(packet_id)
            .payload(payload_bytes)
            .log(log.clone());

        if options.compress {
            builder = builder.compress();
        }
        if options.integrator {
            builder = builder.integrator();
        }

        let packet = builder
            .build()
            .with_context(|| format!("Failed to build packet {}", packet_id))?;

        let encoded = packet.to_bytes();
        output_data.extend_from_slice(&encoded);

        info!(
            "Packed packet {} ({} bytes, compressed: {})",
            packet_id,
            encoded.len(),
            packet.is_compressed()
        );
    }

    fs::write(output, &output_data)
        .with_context(|| format!("Failed to write output file: {}", output))?;

    info!(
        "Successfully packed {} packets ({} bytes total)",
        payloads.len(),
        output_data.len()
    );

    Ok(payloads.len())
}
