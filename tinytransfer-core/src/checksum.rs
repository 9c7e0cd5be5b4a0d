//! fletcher16 checksum shared by headers, payloads and RPC args

use crate::constants::FLETCHER_BLOCK_LEN;

/// Compute the fletcher16 checksum of `data`.
///
/// The upper byte holds the second accumulator and the lower byte the first.
/// Input is reduced modulo 255 every [`FLETCHER_BLOCK_LEN`] bytes, the longest
/// run for which the 32-bit accumulators cannot overflow.
pub fn fletcher16(data: &[u8]) -> u16 {
    let mut c0: u32 = 0;
    let mut c1: u32 = 0;

    for block in data.chunks(FLETCHER_BLOCK_LEN) {
        for &byte in block {
            c0 += byte as u32;
            c1 += c0;
        }
        c0 %= 255;
        c1 %= 255;
    }

    ((c1 << 8) | c0) as u16
}
