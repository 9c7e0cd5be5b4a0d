//! Update packet framing

use super::PacketKind;
use crate::constants::{UPDATE_HEADER_SIZE, UPDATE_MAX_PACKET_SIZE, UPDATE_SOH};
use crate::error::PacketError;
use crate::types::UpdateHeader;
use crate::update::UpdatePacket;

/// Update packets: 16-byte header, then payload and log sections
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateKind;

impl PacketKind for UpdateKind {
    type Header = UpdateHeader;
    type Packet = UpdatePacket;

    const SOH: u32 = UPDATE_SOH;
    const HEADER_SIZE: usize = UPDATE_HEADER_SIZE;
    const MAX_PACKET_SIZE: usize = UPDATE_MAX_PACKET_SIZE;
    const NAME: &'static str = "update";

    fn empty() -> UpdatePacket {
        UpdatePacket::empty()
    }

    fn decode_header(bytes: &[u8]) -> UpdateHeader {
        let mut raw = [0u8; UPDATE_HEADER_SIZE];
        raw.copy_from_slice(bytes);
        UpdateHeader::from_bytes(&raw)
    }

    fn check_sizes(header: &UpdateHeader) -> Result<(), PacketError> {
        header.check_sizes()
    }

    fn id(header: &UpdateHeader) -> u32 {
        header.packet_id
    }

    fn body_lens(header: &UpdateHeader) -> [usize; 2] {
        [header.payload_size as usize, header.log_size as usize]
    }

    fn set_header(packet: &mut UpdatePacket, header: UpdateHeader, checksum: u16) {
        packet.header = header;
        packet.header_checksum = checksum;
    }

    fn section(packet: &UpdatePacket, index: usize) -> &[u8] {
        match index {
            0 => &packet.payload,
            _ => &packet.log,
        }
    }

    fn section_mut(packet: &mut UpdatePacket, index: usize) -> &mut [u8] {
        match index {
            0 => &mut packet.payload,
            _ => &mut packet.log,
        }
    }

    fn validate(packet: &UpdatePacket) -> Result<(), PacketError> {
        packet.validate()
    }

    fn wire_size(packet: &UpdatePacket) -> usize {
        packet.wire_size()
    }
}
