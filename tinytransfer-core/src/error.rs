//! Error types for TinyTransfer operations

use alloc::string::String;

/// Errors that can occur while building, validating or decoding packets
#[cfg_attr(feature = "std", derive(thiserror::Error))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Start-of-header magic does not match the packet kind
    #[cfg_attr(feature = "std", error("Bad start of header: expected {expected:#010x}, got {actual:#010x}"))]
    BadSoh {
        /// The SOH constant for this packet kind.
        expected: u32,
        /// The value found in the header.
        actual: u32,
    },

    /// Header checksum does not match the header bytes
    #[cfg_attr(feature = "std", error("Header checksum mismatch: expected {expected:#06x}, got {actual:#06x}"))]
    HeaderChecksumMismatch {
        /// The checksum carried on the wire.
        expected: u16,
        /// The checksum computed over the header.
        actual: u16,
    },

    /// Payload (or RPC args) checksum does not match the body bytes
    #[cfg_attr(feature = "std", error("Payload checksum mismatch: expected {expected:#06x}, got {actual:#06x}"))]
    PayloadChecksumMismatch {
        /// The checksum carried in the header.
        expected: u16,
        /// The checksum computed over the body.
        actual: u16,
    },

    /// A size field read from a header exceeds its buffer capacity
    #[cfg_attr(feature = "std", error("Field {field} claims {size} bytes, capacity is {max}"))]
    FieldTooLarge {
        /// Name of the size field.
        field: &'static str,
        /// Size claimed by the header.
        size: usize,
        /// Buffer capacity.
        max: usize,
    },

    /// Caller supplied more data than a packet buffer can hold
    #[cfg_attr(feature = "std", error("Input {field} is {size} bytes, capacity is {max}"))]
    InputTooLarge {
        /// Name of the input.
        field: &'static str,
        /// Length supplied by the caller.
        size: usize,
        /// Buffer capacity.
        max: usize,
    },

    /// Not enough bytes to hold a complete packet
    #[cfg_attr(feature = "std", error("Incomplete packet: expected {expected} bytes, got {actual}"))]
    IncompletePacket {
        /// The number of bytes expected.
        expected: usize,
        /// The number of bytes actually found.
        actual: usize,
    },

    /// Output slice is shorter than the data to be written
    #[cfg_attr(feature = "std", error("Output buffer too small: need {needed} bytes, have {available}"))]
    BufferTooSmall {
        /// Bytes required.
        needed: usize,
        /// Bytes available in the output slice.
        available: usize,
    },

    /// Compression adapter produced more output than the target buffer holds
    #[cfg_attr(feature = "std", error("Compression output exceeds {capacity} byte buffer"))]
    OutputOverflow {
        /// Capacity of the output buffer.
        capacity: usize,
    },

    /// Compression adapter made no progress
    #[cfg_attr(feature = "std", error("Compression adapter stalled during {0}"))]
    CompressionStalled(&'static str),

    /// Compression adapter reported a failure
    #[cfg_attr(feature = "std", error("Codec error: {0}"))]
    Codec(String),

    /// IO error during read/write
    #[cfg_attr(feature = "std", error("IO error: {0}"))]
    Io(String),
}

#[cfg(feature = "std")]
impl From<std::io::Error> for PacketError {
    fn from(err: std::io::Error) -> Self {
        PacketError::Io(err.to_string())
    }
}

/// Fails with [`PacketError::InputTooLarge`] when `size` exceeds `max`
pub(crate) fn check_input(field: &'static str, size: usize, max: usize) -> Result<(), PacketError> {
    if size > max {
        return Err(PacketError::InputTooLarge { field, size, max });
    }
    Ok(())
}

/// Fails with [`PacketError::FieldTooLarge`] when a header size exceeds `max`
pub(crate) fn check_field(field: &'static str, size: u16, max: usize) -> Result<(), PacketError> {
    if size as usize > max {
        return Err(PacketError::FieldTooLarge {
            field,
            size: size as usize,
            max,
        });
    }
    Ok(())
}
