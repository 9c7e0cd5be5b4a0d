//! Basic encoding example

use bytes::Bytes;
use tinytransfer_core::{RpcPacket, UpdatePacketBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("TinyTransfer Basic Encoding Example\n");

    let mut output = Vec::new();

    for i in 1..=5 {
        let payload = format!("seq={} temp=21.{} volts=3.30 rssi=-71 state=nominal", i, i).repeat(3);

        let mut builder = UpdatePacketBuilder::new(i)
            .payload(Bytes::from(payload))
            .compress();

        if i == 5 {
            builder = builder.integrator();
        } else {
            builder = builder.log(Bytes::from(format!("tick {}", i)));
        }

        let packet = builder.build()?;
        let encoded = packet.to_bytes();

        println!(
            "Update {}: {} bytes (payload {} bytes, compressed: {}, header checksum {:#06x})",
            i,
            encoded.len(),
            packet.payload().len(),
            packet.is_compressed(),
            packet.header_checksum()
        );
        output.extend_from_slice(&encoded);
    }

    let call = RpcPacket::new(0xC0FFEE, 3, &[0x01, 0x00])?;
    println!("RPC call: {} bytes", call.wire_size());
    output.extend_from_slice(&call.to_bytes());

    std::fs::write("example_output.tt", &output)?;

    println!("\nWrote {} bytes to example_output.tt", output.len());
    println!("Use 'tinytransfer scan --input example_output.tt' to read it back");

    Ok(())
}
