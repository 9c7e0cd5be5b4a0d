//! Header layouts for update and RPC packets
//!
//! Headers are plain values packed to and from little-endian bytes
//! explicitly. The header checksum always covers exactly these bytes.

use crate::checksum::fletcher16;
use crate::constants::{
    UpdateFlags, RPC_HEADER_SIZE, RPC_MAX_ARGS_LEN, RPC_SOH, UPDATE_HEADER_SIZE,
    UPDATE_MAX_LOG_LEN, UPDATE_MAX_PAYLOAD_LEN, UPDATE_SOH,
};
use crate::error::{check_field, PacketError};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Update packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateHeader {
    /// Start of header, [`UPDATE_SOH`] for a well-formed packet
    pub soh: u32,

    /// Unique packet identifier
    pub packet_id: u32,

    /// Compression and integrator flags
    pub flags: UpdateFlags,

    /// Number of payload bytes following the header checksum
    pub payload_size: u16,

    /// fletcher16 of the payload bytes
    pub payload_checksum: u16,

    /// Number of log bytes following the payload
    pub log_size: u16,
}

impl Default for UpdateHeader {
    fn default() -> Self {
        Self {
            soh: UPDATE_SOH,
            packet_id: 0,
            flags: UpdateFlags::default(),
            payload_size: 0,
            payload_checksum: 0,
            log_size: 0,
        }
    }
}

impl UpdateHeader {
    /// Pack the header into its wire bytes
    pub fn to_bytes(&self) -> [u8; UPDATE_HEADER_SIZE] {
        let mut out = [0u8; UPDATE_HEADER_SIZE];
        let mut cursor = &mut out[..];
        cursor.put_u32_le(self.soh);
        cursor.put_u32_le(self.packet_id);
        cursor.put_u16_le(self.flags.bits());
        cursor.put_u16_le(self.payload_size);
        cursor.put_u16_le(self.payload_checksum);
        cursor.put_u16_le(self.log_size);
        out
    }

    /// Unpack a header from its wire bytes
    pub fn from_bytes(bytes: &[u8; UPDATE_HEADER_SIZE]) -> Self {
        Self {
            soh: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            packet_id: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            flags: UpdateFlags::new(u16::from_le_bytes([bytes[8], bytes[9]])),
            payload_size: u16::from_le_bytes([bytes[10], bytes[11]]),
            payload_checksum: u16::from_le_bytes([bytes[12], bytes[13]]),
            log_size: u16::from_le_bytes([bytes[14], bytes[15]]),
        }
    }

    /// fletcher16 over the packed header
    pub fn checksum(&self) -> u16 {
        fletcher16(&self.to_bytes())
    }

    /// Reject payload or log sizes that exceed buffer capacity
    pub fn check_sizes(&self) -> Result<(), PacketError> {
        check_field("payload_size", self.payload_size, UPDATE_MAX_PAYLOAD_LEN)?;
        check_field("log_size", self.log_size, UPDATE_MAX_LOG_LEN)
    }

    /// Number of body bytes (payload + log) that follow the header checksum
    pub fn body_len(&self) -> usize {
        self.payload_size as usize + self.log_size as usize
    }
}

/// RPC packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcHeader {
    /// Start of header, [`RPC_SOH`] for a well-formed packet
    pub soh: u32,

    /// Caller-chosen nonce
    pub nonce: u32,

    /// Procedure to invoke
    pub proc_id: u16,

    /// Number of args bytes following the header checksum
    pub args_length: u16,

    /// fletcher16 of the args bytes
    pub args_checksum: u16,
}

impl Default for RpcHeader {
    fn default() -> Self {
        Self {
            soh: RPC_SOH,
            nonce: 0,
            proc_id: 0,
            args_length: 0,
            args_checksum: 0,
        }
    }
}

impl RpcHeader {
    /// Pack the header into its wire bytes
    pub fn to_bytes(&self) -> [u8; RPC_HEADER_SIZE] {
        let mut out = [0u8; RPC_HEADER_SIZE];
        let mut cursor = &mut out[..];
        cursor.put_u32_le(self.soh);
        cursor.put_u32_le(self.nonce);
        cursor.put_u16_le(self.proc_id);
        cursor.put_u16_le(self.args_length);
        cursor.put_u16_le(self.args_checksum);
        out
    }

    /// Unpack a header from its wire bytes
    pub fn from_bytes(bytes: &[u8; RPC_HEADER_SIZE]) -> Self {
        Self {
            soh: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            nonce: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            proc_id: u16::from_le_bytes([bytes[8], bytes[9]]),
            args_length: u16::from_le_bytes([bytes[10], bytes[11]]),
            args_checksum: u16::from_le_bytes([bytes[12], bytes[13]]),
        }
    }

    /// fletcher16 over the packed header
    pub fn checksum(&self) -> u16 {
        fletcher16(&self.to_bytes())
    }

    /// Reject an args length that exceeds buffer capacity
    pub fn check_sizes(&self) -> Result<(), PacketError> {
        check_field("args_length", self.args_length, RPC_MAX_ARGS_LEN)
    }
}
