//! RPC packet codec
//!
//! Wire layout (little-endian):
//!
//! ```text
//! 0x00  4E 4D 45 49       start of header
//! 0x04  u32               nonce
//! 0x08  u16               procedure id
//! 0x0A  u16               args length
//! 0x0C  u16               args checksum (fletcher16)
//! 0x0E  u16               header checksum (fletcher16 of 0x00..0x0E)
//! 0x10  [args length]     args
//! ```

use crate::checksum::fletcher16;
use crate::constants::{HEADER_CHECKSUM_SIZE, RPC_HEADER_SIZE, RPC_MAX_ARGS_LEN, RPC_SOH};
use crate::error::{check_input, PacketError};
use crate::types::RpcHeader;
use bytes::{BufMut, Bytes, BytesMut};

/// A remote procedure call with a fixed-capacity args buffer
#[derive(Clone)]
pub struct RpcPacket {
    pub(crate) header: RpcHeader,
    pub(crate) header_checksum: u16,
    pub(crate) args: [u8; RPC_MAX_ARGS_LEN],
}

impl RpcPacket {
    pub(crate) fn empty() -> Self {
        Self {
            header: RpcHeader::default(),
            header_checksum: 0,
            args: [0u8; RPC_MAX_ARGS_LEN],
        }
    }

    /// Build a call to `proc_id` carrying `args`
    pub fn new(nonce: u32, proc_id: u16, args: &[u8]) -> Result<Self, PacketError> {
        check_input("args", args.len(), RPC_MAX_ARGS_LEN)?;

        let mut packet = Self::empty();
        packet.args[..args.len()].copy_from_slice(args);
        packet.header.nonce = nonce;
        packet.header.proc_id = proc_id;
        packet.header.args_length = args.len() as u16;
        packet.header.args_checksum = fletcher16(args);
        packet.header_checksum = packet.header.checksum();
        Ok(packet)
    }

    /// Copy a packet out of raw received bytes without validating it.
    ///
    /// The args length is read from the copied header, and at most
    /// [`RPC_MAX_ARGS_LEN`] args bytes are taken. Use
    /// [`validate`](Self::validate) afterwards to check the result.
    pub fn from_raw(raw: &[u8]) -> Result<Self, PacketError> {
        const PREFIX: usize = RPC_HEADER_SIZE + HEADER_CHECKSUM_SIZE;

        if raw.len() < PREFIX {
            return Err(PacketError::IncompletePacket {
                expected: PREFIX,
                actual: raw.len(),
            });
        }

        let mut header_bytes = [0u8; RPC_HEADER_SIZE];
        header_bytes.copy_from_slice(&raw[..RPC_HEADER_SIZE]);

        let mut packet = Self::empty();
        packet.header = RpcHeader::from_bytes(&header_bytes);
        packet.header_checksum = u16::from_le_bytes([raw[RPC_HEADER_SIZE], raw[RPC_HEADER_SIZE + 1]]);

        // Length comes from the header just copied
        let copy_len = (packet.header.args_length as usize).min(RPC_MAX_ARGS_LEN);
        if raw.len() < PREFIX + copy_len {
            return Err(PacketError::IncompletePacket {
                expected: PREFIX + copy_len,
                actual: raw.len(),
            });
        }
        packet.args[..copy_len].copy_from_slice(&raw[PREFIX..PREFIX + copy_len]);

        Ok(packet)
    }

    /// Strictly decode one packet from the start of `raw`.
    ///
    /// Returns the packet and the number of bytes it occupied.
    pub fn from_bytes(raw: &[u8]) -> Result<(Self, usize), PacketError> {
        let packet = Self::from_raw(raw)?;
        packet.validate()?;
        let size = packet.wire_size();
        Ok((packet, size))
    }

    /// Decoded header
    pub fn header(&self) -> &RpcHeader {
        &self.header
    }

    /// Caller nonce
    pub fn nonce(&self) -> u32 {
        self.header.nonce
    }

    /// Procedure identifier
    pub fn proc_id(&self) -> u16 {
        self.header.proc_id
    }

    /// Header checksum carried with the packet
    pub fn header_checksum(&self) -> u16 {
        self.header_checksum
    }

    /// Argument bytes
    pub fn args(&self) -> &[u8] {
        let len = (self.header.args_length as usize).min(RPC_MAX_ARGS_LEN);
        &self.args[..len]
    }

    /// Serialized length: header, header checksum and args
    pub fn wire_size(&self) -> usize {
        RPC_HEADER_SIZE + HEADER_CHECKSUM_SIZE + self.args().len()
    }

    /// Validate the packet
    ///
    /// All four conditions must hold: start of header, header checksum,
    /// args length within capacity and args checksum.
    pub fn validate(&self) -> Result<(), PacketError> {
        if self.header.soh != RPC_SOH {
            return Err(PacketError::BadSoh {
                expected: RPC_SOH,
                actual: self.header.soh,
            });
        }

        let actual = self.header.checksum();
        if actual != self.header_checksum {
            return Err(PacketError::HeaderChecksumMismatch {
                expected: self.header_checksum,
                actual,
            });
        }

        self.header.check_sizes()?;

        let actual = fletcher16(self.args());
        if actual != self.header.args_checksum {
            return Err(PacketError::PayloadChecksumMismatch {
                expected: self.header.args_checksum,
                actual,
            });
        }

        Ok(())
    }

    /// Check if the packet passes [`validate`](Self::validate)
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Write the packet into `output`, returning the number of bytes written
    pub fn serialize(&self, output: &mut [u8]) -> Result<usize, PacketError> {
        let needed = self.wire_size();
        if output.len() < needed {
            return Err(PacketError::BufferTooSmall {
                needed,
                available: output.len(),
            });
        }

        let mut cursor = &mut output[..needed];
        cursor.put_slice(&self.header.to_bytes());
        cursor.put_u16_le(self.header_checksum);
        cursor.put_slice(self.args());

        Ok(needed)
    }

    /// Serialize into a freshly allocated buffer
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        buf.put_slice(&self.header.to_bytes());
        buf.put_u16_le(self.header_checksum);
        buf.put_slice(self.args());
        buf.freeze()
    }
}

impl PartialEq for RpcPacket {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.header_checksum == other.header_checksum
            && self.args() == other.args()
    }
}

impl Eq for RpcPacket {}

impl core::fmt::Debug for RpcPacket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RpcPacket")
            .field("header", &self.header)
            .field("header_checksum", &self.header_checksum)
            .field("args", &self.args())
            .finish()
    }
}
