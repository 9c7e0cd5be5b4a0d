//! Incremental byte-stream parsers
//!
//! Each parser consumes one byte per call and returns a packet from the call
//! that completes it. Nothing is surfaced for noise: headers that fail their
//! checksum, headers that claim sizes beyond buffer capacity, and packets
//! whose body fails its checksum are dropped and the parser goes back to
//! hunting for a start of header. Those events are only counted in
//! [`ParserStats`].
//!
//! A dropped candidate's bytes after its false start of header are fed
//! through the state machine again, so a genuine packet that began inside a
//! rejected header or a torn body is still found. A packet found that way is
//! returned from the call that triggered the replay, or from a later call if
//! one was already returned, and [`StreamParser::consumed`] tells where in
//! the stream it ended.
//!
//! Both parsers are the same machine, [`PacketParser`], specialized by a
//! [`PacketKind`]:
//!
//! ```text
//! SeekSoh -> Header -> HeaderChecksum -> Payload -> Log
//!                           |               |         |
//!                           +---------------+---------+--> complete
//! ```

mod rpc;
mod update;

pub use rpc::RpcKind;
pub use update::UpdateKind;

use crate::checksum::fletcher16;
use crate::constants::{HEADER_CHECKSUM_SIZE, SOH_SIZE, UPDATE_HEADER_SIZE};
use crate::error::PacketError;
use alloc::collections::VecDeque;
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Reassembles update packets from a byte stream
pub type UpdateParser = PacketParser<UpdateKind>;

/// Reassembles RPC packets from a byte stream
pub type RpcParser = PacketParser<RpcKind>;

/// Parser state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Sliding over the stream looking for the start of header
    SeekSoh,
    /// Collecting header bytes after the start of header
    Header,
    /// Collecting the two header checksum bytes
    HeaderChecksum,
    /// Collecting payload (or RPC args) bytes
    Payload,
    /// Collecting log bytes (update packets only)
    Log,
}

/// Counters kept by a parser across packets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParserStats {
    /// Bytes handed to `process_byte`
    pub bytes_processed: u64,

    /// Start-of-header matches, including false ones
    pub soh_matches: u64,

    /// Headers dropped because their checksum did not match
    pub header_checksum_failures: u64,

    /// Headers dropped because a size field exceeded buffer capacity
    pub oversized_fields: u64,

    /// Packets dropped because the payload or args checksum did not match
    pub payload_checksum_failures: u64,

    /// Valid packets returned
    pub packets_completed: u64,
}

/// A byte-at-a-time packet parser
pub trait StreamParser: Default {
    /// Packet type produced by this parser
    type Packet;

    /// Feed one byte, returning a packet if this byte completed one
    fn process_byte(&mut self, byte: u8) -> Option<Self::Packet>;

    /// Give up on a partial packet at the end of the stream.
    ///
    /// Its bytes are replayed like a rejected candidate's. Call until it
    /// returns `None`.
    fn flush(&mut self) -> Option<Self::Packet>;

    /// Drop any partial packet and go back to hunting for a start of header
    fn reset(&mut self);

    /// Current state machine position
    fn state(&self) -> ParserState;

    /// Counters accumulated since construction
    fn stats(&self) -> &ParserStats;

    /// Stream bytes the state machine is done with; right after a
    /// completion this is the end of the returned packet
    fn consumed(&self) -> u64;

    /// Serialized size of a packet, used to locate it in a stream
    fn wire_size(packet: &Self::Packet) -> usize;
}

/// Layout and validation hooks for one packet family.
///
/// A packet is a header starting with [`SOH`](Self::SOH), a little-endian
/// header checksum, then up to two body sections whose lengths come from
/// the header.
pub trait PacketKind {
    /// Decoded header
    type Header: Copy + Default;

    /// Packet produced on completion
    type Packet: Clone;

    /// Start of header, as a little-endian u32
    const SOH: u32;

    /// Header length including the start of header
    const HEADER_SIZE: usize;

    /// Largest serialized packet
    const MAX_PACKET_SIZE: usize;

    /// Name used in log lines
    const NAME: &'static str;

    /// A packet with zeroed buffers to parse into
    fn empty() -> Self::Packet;

    /// Unpack a header from exactly [`HEADER_SIZE`](Self::HEADER_SIZE) bytes
    fn decode_header(bytes: &[u8]) -> Self::Header;

    /// Reject size fields beyond buffer capacity
    fn check_sizes(header: &Self::Header) -> Result<(), PacketError>;

    /// Identifier used in log lines
    fn id(header: &Self::Header) -> u32;

    /// Lengths of the two body sections
    fn body_lens(header: &Self::Header) -> [usize; 2];

    /// Install an accepted header and its checksum
    fn set_header(packet: &mut Self::Packet, header: Self::Header, checksum: u16);

    /// Backing buffer of body section `index`
    fn section(packet: &Self::Packet, index: usize) -> &[u8];

    /// Mutable backing buffer of body section `index`
    fn section_mut(packet: &mut Self::Packet, index: usize) -> &mut [u8];

    /// Full packet validation
    fn validate(packet: &Self::Packet) -> Result<(), PacketError>;

    /// Serialized size
    fn wire_size(packet: &Self::Packet) -> usize;
}

/// Rolling 32-bit window over the most recent four bytes.
///
/// Each byte enters at the top so that the window, read as a little-endian
/// u32, equals the start of header once its four bytes have arrived in
/// wire order.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SohWindow(u32);

impl SohWindow {
    /// Shift `byte` in, returning true when the window equals `soh`
    pub(crate) fn push(&mut self, byte: u8, soh: u32) -> bool {
        self.0 = (self.0 >> 8) | ((byte as u32) << 24);
        self.0 == soh
    }

    pub(crate) fn clear(&mut self) {
        self.0 = 0;
    }
}

/// Result of advancing a state machine by one byte
pub(crate) enum Step<P> {
    /// Need more bytes
    Pending,
    /// Candidate dropped; its consumed bytes must be replayed
    Rejected,
    /// A packet is complete
    Complete(P),
}

/// Byte-at-a-time parser for one [`PacketKind`]
pub struct PacketParser<K: PacketKind> {
    state: ParserState,
    window: SohWindow,
    header: [u8; UPDATE_HEADER_SIZE],
    checksum: [u8; HEADER_CHECKSUM_SIZE],
    lens: [usize; 2],
    packet: K::Packet,
    position: usize,
    // Stream bytes not yet run through the state machine, oldest first.
    // Always a contiguous run ending at the caller's latest byte.
    replay: VecDeque<u8>,
    stats: ParserStats,
}

impl<K: PacketKind> PacketParser<K> {
    /// Create a parser hunting for its first start of header
    pub fn new() -> Self {
        Self {
            state: ParserState::SeekSoh,
            window: SohWindow::default(),
            header: [0u8; UPDATE_HEADER_SIZE],
            checksum: [0u8; HEADER_CHECKSUM_SIZE],
            lens: [0; 2],
            packet: K::empty(),
            position: 0,
            replay: VecDeque::with_capacity(K::MAX_PACKET_SIZE),
            stats: ParserStats::default(),
        }
    }

    /// Feed one byte, returning the packet this byte completed, if any
    pub fn process_byte(&mut self, byte: u8) -> Option<K::Packet> {
        self.stats.bytes_processed += 1;
        self.replay.push_back(byte);
        self.drain()
    }

    /// Give up on a partial packet at the end of the stream and replay its
    /// bytes. Call until it returns `None`.
    pub fn flush(&mut self) -> Option<K::Packet> {
        loop {
            if let Some(packet) = self.drain() {
                return Some(packet);
            }
            if self.state == ParserState::SeekSoh {
                return None;
            }
            self.rewind();
        }
    }

    /// Drop any partial packet and pending replay, and go back to hunting
    /// for a start of header
    pub fn reset(&mut self) {
        self.replay.clear();
        self.restart();
    }

    /// Current state machine position
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Counters accumulated since construction
    pub fn stats(&self) -> &ParserStats {
        &self.stats
    }

    /// Stream bytes the state machine is done with
    pub fn consumed(&self) -> u64 {
        self.stats.bytes_processed - self.replay.len() as u64
    }

    fn drain(&mut self) -> Option<K::Packet> {
        while let Some(next) = self.replay.pop_front() {
            match self.step(next) {
                Step::Pending => {}
                Step::Rejected => self.rewind(),
                Step::Complete(packet) => return Some(packet),
            }
        }
        None
    }

    fn restart(&mut self) {
        self.state = ParserState::SeekSoh;
        self.window.clear();
        self.header = [0u8; UPDATE_HEADER_SIZE];
        self.checksum = [0u8; HEADER_CHECKSUM_SIZE];
        self.lens = [0; 2];
        K::set_header(&mut self.packet, K::Header::default(), 0);
        self.position = 0;
    }

    /// Put every byte of the current candidate after its first back in
    /// front of the replay queue, then restart
    fn rewind(&mut self) {
        let (header_end, checksum_end, body) = match self.state {
            ParserState::SeekSoh => (1, 0, [0, 0]),
            ParserState::Header => (self.position, 0, [0, 0]),
            ParserState::HeaderChecksum => (K::HEADER_SIZE, self.position, [0, 0]),
            ParserState::Payload => (K::HEADER_SIZE, HEADER_CHECKSUM_SIZE, [self.position, 0]),
            ParserState::Log => (
                K::HEADER_SIZE,
                HEADER_CHECKSUM_SIZE,
                [self.lens[0], self.position],
            ),
        };

        let consumed = [
            &self.header[1..header_end],
            &self.checksum[..checksum_end],
            &K::section(&self.packet, 0)[..body[0]],
            &K::section(&self.packet, 1)[..body[1]],
        ];
        for part in consumed.iter().rev() {
            for &byte in part.iter().rev() {
                self.replay.push_front(byte);
            }
        }

        self.restart();
    }

    fn step(&mut self, byte: u8) -> Step<K::Packet> {
        match self.state {
            ParserState::SeekSoh => {
                if self.window.push(byte, K::SOH) {
                    self.stats.soh_matches += 1;

                    #[cfg(feature = "logging")]
                    debug!("Matched {} start of header", K::NAME);

                    self.header[..SOH_SIZE].copy_from_slice(&K::SOH.to_le_bytes());
                    self.position = SOH_SIZE;
                    self.state = ParserState::Header;
                }
                Step::Pending
            }

            ParserState::Header => {
                self.header[self.position] = byte;
                self.position += 1;

                if self.position == K::HEADER_SIZE {
                    self.position = 0;
                    self.state = ParserState::HeaderChecksum;
                }
                Step::Pending
            }

            ParserState::HeaderChecksum => {
                self.checksum[self.position] = byte;
                self.position += 1;

                if self.position < HEADER_CHECKSUM_SIZE {
                    return Step::Pending;
                }
                self.accept_header()
            }

            ParserState::Payload => self.fill(0, byte),

            ParserState::Log => self.fill(1, byte),
        }
    }

    /// Gate on the header checksum and size fields, then pick the next state
    fn accept_header(&mut self) -> Step<K::Packet> {
        let raw = &self.header[..K::HEADER_SIZE];
        let expected = u16::from_le_bytes(self.checksum);
        let actual = fletcher16(raw);
        if actual != expected {
            self.stats.header_checksum_failures += 1;

            #[cfg(feature = "logging")]
            debug!(
                "{} header checksum mismatch: expected {:#06x}, got {:#06x}",
                K::NAME,
                expected,
                actual
            );

            return Step::Rejected;
        }

        let header = K::decode_header(raw);
        if let Err(_e) = K::check_sizes(&header) {
            self.stats.oversized_fields += 1;

            #[cfg(feature = "logging")]
            warn!("Dropping {} header {}: {:?}", K::NAME, K::id(&header), _e);

            return Step::Rejected;
        }

        K::set_header(&mut self.packet, header, expected);
        self.lens = K::body_lens(&header);

        if self.lens[0] > 0 {
            self.enter(ParserState::Payload)
        } else if self.lens[1] > 0 {
            self.enter(ParserState::Log)
        } else {
            self.complete()
        }
    }

    fn enter(&mut self, state: ParserState) -> Step<K::Packet> {
        self.position = 0;
        self.state = state;
        Step::Pending
    }

    /// Store one body byte of section `index`
    fn fill(&mut self, index: usize, byte: u8) -> Step<K::Packet> {
        K::section_mut(&mut self.packet, index)[self.position] = byte;
        self.position += 1;

        if self.position < self.lens[index] {
            return Step::Pending;
        }
        if index == 0 && self.lens[1] > 0 {
            return self.enter(ParserState::Log);
        }
        self.complete()
    }

    fn complete(&mut self) -> Step<K::Packet> {
        if let Err(_e) = K::validate(&self.packet) {
            self.stats.payload_checksum_failures += 1;

            #[cfg(feature = "logging")]
            warn!("Dropping {} packet: {:?}", K::NAME, _e);

            return Step::Rejected;
        }

        let packet = self.packet.clone();
        self.restart();
        self.stats.packets_completed += 1;

        #[cfg(feature = "logging")]
        debug!(
            "Completed {} packet ({} bytes)",
            K::NAME,
            K::wire_size(&packet)
        );

        Step::Complete(packet)
    }
}

impl<K: PacketKind> Default for PacketParser<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PacketKind> StreamParser for PacketParser<K> {
    type Packet = K::Packet;

    fn process_byte(&mut self, byte: u8) -> Option<K::Packet> {
        PacketParser::process_byte(self, byte)
    }

    fn flush(&mut self) -> Option<K::Packet> {
        PacketParser::flush(self)
    }

    fn reset(&mut self) {
        PacketParser::reset(self)
    }

    fn state(&self) -> ParserState {
        self.state
    }

    fn stats(&self) -> &ParserStats {
        &self.stats
    }

    fn consumed(&self) -> u64 {
        PacketParser::consumed(self)
    }

    fn wire_size(packet: &K::Packet) -> usize {
        K::wire_size(packet)
    }
}
