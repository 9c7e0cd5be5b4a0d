//! Example demonstrating recovery of packets from a noisy link

use bytes::Bytes;
use tinytransfer_core::{
    constants::UPDATE_MAX_PAYLOAD_LEN, scanner::scan_stream_with_stats, DeflateDecoder,
    UpdatePacketBuilder, UpdateParser,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("TinyTransfer Noisy Link Recovery Example\n");

    // Step 1: Create a clean stream with 10 packets
    println!("Step 1: Creating 10 packets...");
    let mut stream = Vec::new();

    for i in 1..=10 {
        let payload = format!("Important data from sensor {}", i).repeat(4);

        let packet = UpdatePacketBuilder::new(i)
            .payload(Bytes::from(payload))
            .compress()
            .build()?;

        stream.extend_from_slice(&packet.to_bytes());
    }

    println!("Created clean stream: {} bytes\n", stream.len());

    // Step 2: Simulate interference
    println!("Step 2: Simulating interference...");

    if stream.len() > 120 {
        stream[100..120].fill(0xFF);
        println!("Jammed bytes 100-120");
    }

    if stream.len() > 300 {
        stream.drain(280..300);
        println!("Dropped bytes 280-300");
    }

    // A burst of noise that happens to contain a start of header
    let mut noisy = vec![0x13, 0x4D, 0x44, 0x4C, 0x4E, 0x00, 0x42, 0x99];
    noisy.extend_from_slice(&stream);
    let stream = noisy;
    println!("Prepended 8 bytes of noise with a false start of header");

    println!("Damaged stream: {} bytes\n", stream.len());

    // Step 3: Feed the stream through a parser, as a receiver would
    println!("Step 3: Parsing damaged stream...");
    let (located, stats) = scan_stream_with_stats::<UpdateParser>(&stream);

    println!("Scan Results:");
    println!("  Bytes scanned:       {}", stats.bytes_scanned);
    println!("  SOH matches:         {}", stats.soh_matches);
    println!("  Valid packets:       {}", stats.packets_found);
    println!("  Header rejects:      {}", stats.header_rejects);
    println!("  Checksum failures:   {}", stats.payload_checksum_failures);
    println!("  Recovery rate:       {:.1}%\n", stats.recovery_rate());

    // Step 4: Decompress what survived
    println!("Step 4: Recovered payloads:");
    let mut decoder = DeflateDecoder::new();
    let mut out = [0u8; UPDATE_MAX_PAYLOAD_LEN];
    for lp in &located {
        let n = lp.packet.decompress_payload(&mut decoder, &mut out)?;
        println!(
            "  packet {:>2} @ offset {:>4}: {}",
            lp.packet.packet_id(),
            lp.offset,
            String::from_utf8_lossy(&out[..n.min(32)])
        );
    }

    Ok(())
}
