//! Update packet codec
//!
//! An update packet carries one telemetry payload, optionally compressed,
//! followed by an optional log blob. Wire layout (little-endian):
//!
//! ```text
//! 0x00  4D 44 4C 4E       start of header
//! 0x04  u32               packet id
//! 0x08  u16               flags (bit0 compressed, bit1 integrator)
//! 0x0A  u16               payload size
//! 0x0C  u16               payload checksum (fletcher16)
//! 0x0E  u16               log size
//! 0x10  u16               header checksum (fletcher16 of 0x00..0x10)
//! 0x12  [payload size]    payload
//!       [log size]        log
//! ```

use crate::checksum::fletcher16;
use crate::compression::{self, CompressionAdapter};
use crate::constants::{
    UpdateFlags, HEADER_CHECKSUM_SIZE, UPDATE_HEADER_SIZE, UPDATE_MAX_LOG_LEN,
    UPDATE_MAX_PAYLOAD_LEN, UPDATE_SOH,
};
use crate::error::{check_input, PacketError};
use crate::types::UpdateHeader;
use bytes::{BufMut, Bytes, BytesMut};

#[cfg(feature = "logging")]
use tracing::debug;

/// A complete update packet with fixed-capacity payload and log buffers
#[derive(Clone)]
pub struct UpdatePacket {
    pub(crate) header: UpdateHeader,
    pub(crate) header_checksum: u16,
    pub(crate) payload: [u8; UPDATE_MAX_PAYLOAD_LEN],
    pub(crate) log: [u8; UPDATE_MAX_LOG_LEN],
}

impl UpdatePacket {
    /// An empty packet: SOH set, every other field zero
    pub(crate) fn empty() -> Self {
        Self {
            header: UpdateHeader::default(),
            header_checksum: 0,
            payload: [0u8; UPDATE_MAX_PAYLOAD_LEN],
            log: [0u8; UPDATE_MAX_LOG_LEN],
        }
    }

    /// Build an uncompressed packet.
    ///
    /// `data` and `log` must each fit their 1024-byte buffer; longer input is
    /// rejected with [`PacketError::InputTooLarge`]. Integrator packets never
    /// carry a log, so `log` is ignored when `is_integrator` is set.
    pub fn new(data: &[u8], packet_id: u32, log: &[u8], is_integrator: bool) -> Result<Self, PacketError> {
        check_input("payload", data.len(), UPDATE_MAX_PAYLOAD_LEN)?;
        check_input("log", log.len(), UPDATE_MAX_LOG_LEN)?;

        let mut packet = Self::empty();
        packet.store_raw(data);
        packet.finalize(packet_id, log, is_integrator);
        Ok(packet)
    }

    /// Build a packet whose payload is compressed by `codec`.
    ///
    /// The codec is reset before use. When the compressed form does not fit
    /// the payload buffer the data is stored verbatim and the compressed flag
    /// stays clear, so [`decompress_payload`](Self::decompress_payload)
    /// always reproduces `data`.
    pub fn new_compressed<C>(
        codec: &mut C,
        data: &[u8],
        packet_id: u32,
        log: &[u8],
        is_integrator: bool,
    ) -> Result<Self, PacketError>
    where
        C: CompressionAdapter + ?Sized,
    {
        check_input("payload", data.len(), UPDATE_MAX_PAYLOAD_LEN)?;
        check_input("log", log.len(), UPDATE_MAX_LOG_LEN)?;

        let mut packet = Self::empty();
        match compression::pump(codec, data, &mut packet.payload) {
            Ok(size) => {
                packet.header.payload_size = size as u16;
                packet.header.flags = packet.header.flags.with(UpdateFlags::COMPRESSED, true);
            }
            Err(PacketError::OutputOverflow { .. }) => {
                #[cfg(feature = "logging")]
                debug!(
                    "Packet {}: {} byte payload does not compress into {} bytes, storing raw",
                    packet_id,
                    data.len(),
                    UPDATE_MAX_PAYLOAD_LEN
                );

                packet.payload.fill(0);
                packet.store_raw(data);
            }
            Err(e) => return Err(e),
        }
        packet.finalize(packet_id, log, is_integrator);
        Ok(packet)
    }

    fn store_raw(&mut self, data: &[u8]) {
        self.payload[..data.len()].copy_from_slice(data);
        self.header.payload_size = data.len() as u16;
        self.header.flags = self.header.flags.with(UpdateFlags::COMPRESSED, false);
    }

    /// Fill in log, id and flags, then the checksums once every other field is final
    fn finalize(&mut self, packet_id: u32, log: &[u8], is_integrator: bool) {
        if is_integrator {
            self.header.log_size = 0;
        } else {
            self.log[..log.len()].copy_from_slice(log);
            self.header.log_size = log.len() as u16;
        }

        self.header.flags = self.header.flags.with(UpdateFlags::INTEGRATOR, is_integrator);
        self.header.packet_id = packet_id;

        self.header.payload_checksum = fletcher16(self.payload());
        self.header_checksum = self.header.checksum();
    }

    /// Decoded header
    pub fn header(&self) -> &UpdateHeader {
        &self.header
    }

    /// Packet identifier
    pub fn packet_id(&self) -> u32 {
        self.header.packet_id
    }

    /// Packet flags
    pub fn flags(&self) -> UpdateFlags {
        self.header.flags
    }

    /// Header checksum carried with the packet
    pub fn header_checksum(&self) -> u16 {
        self.header_checksum
    }

    /// Payload bytes as carried on the wire (compressed when flagged)
    pub fn payload(&self) -> &[u8] {
        let len = (self.header.payload_size as usize).min(UPDATE_MAX_PAYLOAD_LEN);
        &self.payload[..len]
    }

    /// Log bytes
    pub fn log(&self) -> &[u8] {
        let len = (self.header.log_size as usize).min(UPDATE_MAX_LOG_LEN);
        &self.log[..len]
    }

    /// Check if the payload is compressed
    pub fn is_compressed(&self) -> bool {
        self.header.flags.is_compressed()
    }

    /// Check if the packet came from the integrator
    pub fn is_integrator(&self) -> bool {
        self.header.flags.is_integrator()
    }

    /// Serialized length: header, header checksum, payload and log
    pub fn wire_size(&self) -> usize {
        UPDATE_HEADER_SIZE + HEADER_CHECKSUM_SIZE + self.payload().len() + self.log().len()
    }

    /// Validate the packet
    ///
    /// Checks, in order: start of header, header checksum, size fields
    /// against buffer capacity, payload checksum.
    pub fn validate(&self) -> Result<(), PacketError> {
        if self.header.soh != UPDATE_SOH {
            return Err(PacketError::BadSoh {
                expected: UPDATE_SOH,
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

        let actual = fletcher16(self.payload());
        if actual != self.header.payload_checksum {
            return Err(PacketError::PayloadChecksumMismatch {
                expected: self.header.payload_checksum,
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
        cursor.put_slice(self.payload());
        cursor.put_slice(self.log());

        Ok(needed)
    }

    /// Serialize into a freshly allocated buffer
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        buf.put_slice(&self.header.to_bytes());
        buf.put_u16_le(self.header_checksum);
        buf.put_slice(self.payload());
        buf.put_slice(self.log());
        buf.freeze()
    }

    /// Strictly decode one packet from the start of `data`.
    ///
    /// Returns the packet and the number of bytes it occupied. Trailing
    /// bytes are left untouched.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), PacketError> {
        const PREFIX: usize = UPDATE_HEADER_SIZE + HEADER_CHECKSUM_SIZE;

        if data.len() < PREFIX {
            return Err(PacketError::IncompletePacket {
                expected: PREFIX,
                actual: data.len(),
            });
        }

        let mut header_bytes = [0u8; UPDATE_HEADER_SIZE];
        header_bytes.copy_from_slice(&data[..UPDATE_HEADER_SIZE]);
        let header = UpdateHeader::from_bytes(&header_bytes);

        if header.soh != UPDATE_SOH {
            return Err(PacketError::BadSoh {
                expected: UPDATE_SOH,
                actual: header.soh,
            });
        }

        let header_checksum = u16::from_le_bytes([data[UPDATE_HEADER_SIZE], data[UPDATE_HEADER_SIZE + 1]]);
        let actual = fletcher16(&header_bytes);
        if actual != header_checksum {
            return Err(PacketError::HeaderChecksumMismatch {
                expected: header_checksum,
                actual,
            });
        }

        header.check_sizes()?;

        let total = PREFIX + header.body_len();
        if data.len() < total {
            return Err(PacketError::IncompletePacket {
                expected: total,
                actual: data.len(),
            });
        }

        let payload_end = PREFIX + header.payload_size as usize;
        let mut packet = Self::empty();
        packet.header = header;
        packet.header_checksum = header_checksum;
        packet.payload[..header.payload_size as usize].copy_from_slice(&data[PREFIX..payload_end]);
        packet.log[..header.log_size as usize].copy_from_slice(&data[payload_end..total]);

        packet.validate()?;
        Ok((packet, total))
    }

    /// Recover the application payload into `output`.
    ///
    /// Compressed payloads are run through `codec`; others are copied as-is.
    /// Returns the number of bytes written.
    pub fn decompress_payload<C>(&self, codec: &mut C, output: &mut [u8]) -> Result<usize, PacketError>
    where
        C: CompressionAdapter + ?Sized,
    {
        if self.is_compressed() {
            return compression::pump(codec, self.payload(), output);
        }

        let payload = self.payload();
        if output.len() < payload.len() {
            return Err(PacketError::BufferTooSmall {
                needed: payload.len(),
                available: output.len(),
            });
        }
        output[..payload.len()].copy_from_slice(payload);
        Ok(payload.len())
    }
}

impl PartialEq for UpdatePacket {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header
            && self.header_checksum == other.header_checksum
            && self.payload() == other.payload()
            && self.log() == other.log()
    }
}

impl Eq for UpdatePacket {}

impl core::fmt::Debug for UpdatePacket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UpdatePacket")
            .field("header", &self.header)
            .field("header_checksum", &self.header_checksum)
            .field("payload", &self.payload())
            .field("log", &self.log())
            .finish()
    }
}

/// Builder for update packets
pub struct UpdatePacketBuilder {
    packet_id: u32,
    payload: Bytes,
    log: Bytes,
    compress: bool,
    integrator: bool,
}

impl UpdatePacketBuilder {
    /// Create a new builder
    pub fn new(packet_id: u32) -> Self {
        Self {
            packet_id,
            payload: Bytes::new(),
            log: Bytes::new(),
            compress: false,
            integrator: false,
        }
    }

    /// Set the payload
    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Set the log blob
    pub fn log(mut self, log: impl Into<Bytes>) -> Self {
        self.log = log.into();
        self
    }

    /// Compress the payload
    pub fn compress(mut self) -> Self {
        self.compress = true;
        self
    }

    /// Mark as integrator-sourced (drops the log)
    pub fn integrator(mut self) -> Self {
        self.integrator = true;
        self
    }

    /// Build with `codec` used for compression if requested
    pub fn build_with<C>(self, codec: &mut C) -> Result<UpdatePacket, PacketError>
    where
        C: CompressionAdapter + ?Sized,
    {
        if self.compress {
            UpdatePacket::new_compressed(codec, &self.payload, self.packet_id, &self.log, self.integrator)
        } else {
            UpdatePacket::new(&self.payload, self.packet_id, &self.log, self.integrator)
        }
    }

    /// Build, compressing with a fresh DEFLATE encoder if requested
    #[cfg(feature = "deflate")]
    pub fn build(self) -> Result<UpdatePacket, PacketError> {
        let mut encoder = crate::compression::deflate::DeflateEncoder::new();
        self.build_with(&mut encoder)
    }
}
