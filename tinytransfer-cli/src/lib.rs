//! Library entry for tinytransfer-cli used by integration tests and embedding.

pub mod commands;

// Re-export commands for convenience
pub use commands::*;

/// Which packet family a capture is scanned for
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PacketKind {
    /// Telemetry/log update packets
    #[default]
    Update,
    /// Remote procedure calls
    Rpc,
}
