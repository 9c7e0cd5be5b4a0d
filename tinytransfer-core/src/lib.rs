//! # TinyTransfer Core
//!
//! Self-delimiting, checksum-verified packet framing for lossy links such as a
//! radio channel or an append-only flash log.
//!
//! ## Modules
//!
//! - `constants`: Wire constants, capacities and update flags
//! - `checksum`: fletcher16
//! - `types`: Update and RPC header layouts
//! - `compression`: Incremental compression adapter contract and driver
//! - `update`: Update (telemetry/log) packet codec
//! - `rpc`: RPC packet codec
//! - `parser`: Byte-at-a-time parsers that resynchronize on noise
//! - `scanner`: Packet recovery over captured buffers

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod checksum;
pub mod compression;
pub mod constants;
pub mod error;
pub mod parser;
pub mod rpc;
pub mod scanner;
pub mod types;
pub mod update;

// Re-export commonly used types
pub use checksum::fletcher16;
pub use compression::{CompressionAdapter, PollResult};
pub use error::PacketError;
pub use parser::{PacketKind, PacketParser, ParserStats, RpcParser, StreamParser, UpdateParser};
pub use rpc::RpcPacket;
pub use scanner::{scan_rpcs, scan_stream, scan_updates, LocatedPacket, ScanStats};
pub use types::{RpcHeader, UpdateHeader};
pub use update::{UpdatePacket, UpdatePacketBuilder};

#[cfg(feature = "deflate")]
pub use compression::deflate::{DeflateDecoder, DeflateEncoder};

/// Result type alias for TinyTransfer operations
pub type Result<T> = core::result::Result<T, PacketError>;
