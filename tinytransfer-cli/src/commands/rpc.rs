use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use tinytransfer_core::RpcPacket;
use tracing::info;

/// Encode one RPC packet into `output`
pub fn execute(
    output: &str,
    nonce: u32,
    proc_id: u16,
    args_hex: Option<&str>,
    append: bool,
) -> Result<()> {
    let args = match args_hex {
        Some(text) => hex::decode(text.trim()).with_context(|| "Invalid --args-hex value")?,
        None => Vec::new(),
    };

    let packet = RpcPacket::new(nonce, proc_id, &args)
        .with_context(|| format!("Failed to build RPC packet for procedure {}", proc_id))?;

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(output)
        .with_context(|| format!("Failed to open output file: {}", output))?;

    file.write_all(&packet.to_bytes())
        .with_context(|| format!("Failed to write output file: {}", output))?;

    info!(
        "Wrote RPC packet nonce {} proc {} ({} bytes) to {}",
        nonce,
        proc_id,
        packet.wire_size(),
        output
    );

    Ok(())
}
