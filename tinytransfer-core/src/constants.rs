//! Constants and limits for the TinyTransfer wire format

use serde::{Deserialize, Serialize};

/// Update packet start of header, `4D 44 4C 4E` on the wire
pub const UPDATE_SOH: u32 = 0x4E4C_444D;

/// RPC packet start of header, `4E 4D 45 49` on the wire
pub const RPC_SOH: u32 = 0x4945_4D4E;

/// Capacity of the update payload buffer
pub const UPDATE_MAX_PAYLOAD_LEN: usize = 1024;

/// Capacity of the update log buffer
pub const UPDATE_MAX_LOG_LEN: usize = 1024;

/// Capacity of the RPC args buffer
pub const RPC_MAX_ARGS_LEN: usize = 1024;

/// Length of the start-of-header magic
pub const SOH_SIZE: usize = 4;

/// Update header: SOH (4) + packet id (4) + flags (2) + payload size (2)
/// + payload checksum (2) + log size (2) = 16 bytes
pub const UPDATE_HEADER_SIZE: usize = 16;

/// RPC header: SOH (4) + nonce (4) + procedure id (2) + args length (2)
/// + args checksum (2) = 14 bytes
pub const RPC_HEADER_SIZE: usize = 14;

/// Header checksum trailing every header
pub const HEADER_CHECKSUM_SIZE: usize = 2;

/// Largest serialized update packet
pub const UPDATE_MAX_PACKET_SIZE: usize =
    UPDATE_HEADER_SIZE + HEADER_CHECKSUM_SIZE + UPDATE_MAX_PAYLOAD_LEN + UPDATE_MAX_LOG_LEN;

/// Largest serialized RPC packet
pub const RPC_MAX_PACKET_SIZE: usize = RPC_HEADER_SIZE + HEADER_CHECKSUM_SIZE + RPC_MAX_ARGS_LEN;

/// Largest fletcher16 block before the accumulators must be reduced.
/// Solves n > 0 and n * (n + 1) / 2 * (2^8 - 1) < (2^32 - 1).
pub const FLETCHER_BLOCK_LEN: usize = 5802;

/// Update packet flags (stored as a little-endian u16)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateFlags(u16);

impl UpdateFlags {
    /// No flags set
    pub const NONE: u16 = 0x0000;

    /// Payload is compressed
    pub const COMPRESSED: u16 = 0x0001;

    /// Packet was produced by the integrator and carries no log
    pub const INTEGRATOR: u16 = 0x0002;

    /// Create new flags from raw bits
    pub const fn new(flags: u16) -> Self {
        Self(flags)
    }

    /// Get raw flag bits
    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Check if the payload is compressed
    pub const fn is_compressed(&self) -> bool {
        (self.0 & Self::COMPRESSED) != 0
    }

    /// Check if the packet is integrator-sourced
    pub const fn is_integrator(&self) -> bool {
        (self.0 & Self::INTEGRATOR) != 0
    }

    /// Return these flags with `bits` set or cleared
    pub const fn with(self, bits: u16, on: bool) -> Self {
        if on {
            Self(self.0 | bits)
        } else {
            Self(self.0 & !bits)
        }
    }
}
