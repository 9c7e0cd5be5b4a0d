//! Raw DEFLATE adapters backed by `flate2`
//!
//! Both adapters stage at most [`SINK_WINDOW`] input bytes at a time, the
//! way an embedded streaming codec with a fixed input buffer would.

use super::{CompressionAdapter, PollResult};
use crate::error::PacketError;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

/// Input bytes a deflate adapter stages before they must be polled
pub const SINK_WINDOW: usize = 256;

/// Streaming raw-DEFLATE compressor
pub struct DeflateEncoder {
    inner: Compress,
    pending: Vec<u8>,
    finishing: bool,
    done: bool,
}

impl DeflateEncoder {
    /// Create an encoder at the default compression level
    pub fn new() -> Self {
        Self::with_level(Compression::default())
    }

    /// Create an encoder at a specific compression level
    pub fn with_level(level: Compression) -> Self {
        Self {
            inner: Compress::new(level, false),
            pending: Vec::with_capacity(SINK_WINDOW),
            finishing: false,
            done: false,
        }
    }
}

impl Default for DeflateEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for DeflateEncoder {
    fn reset(&mut self) {
        self.inner.reset();
        self.pending.clear();
        self.finishing = false;
        self.done = false;
    }

    fn sink(&mut self, input: &[u8]) -> Result<usize, PacketError> {
        if self.finishing {
            return Err(PacketError::Codec("sink after finish".to_string()));
        }
        let take = input.len().min(SINK_WINDOW - self.pending.len());
        self.pending.extend_from_slice(&input[..take]);
        Ok(take)
    }

    fn poll(&mut self, output: &mut [u8]) -> Result<PollResult, PacketError> {
        if self.done || output.is_empty() {
            return Ok(PollResult::new(0, !self.done && self.finishing));
        }

        let flush = if self.finishing {
            FlushCompress::Finish
        } else {
            FlushCompress::None
        };

        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();
        let status = self
            .inner
            .compress(&self.pending, output, flush)
            .map_err(|e| PacketError::Codec(e.to_string()))?;
        let consumed = (self.inner.total_in() - before_in) as usize;
        let produced = (self.inner.total_out() - before_out) as usize;
        self.pending.drain(..consumed);

        if status == Status::StreamEnd {
            self.done = true;
        }

        let more = if self.finishing {
            !self.done
        } else {
            produced == output.len()
        };
        Ok(PollResult::new(produced, more))
    }

    fn finish(&mut self) -> Result<bool, PacketError> {
        self.finishing = true;
        Ok(!self.done)
    }
}

/// Streaming raw-DEFLATE decompressor
pub struct DeflateDecoder {
    inner: Decompress,
    pending: Vec<u8>,
    finishing: bool,
    done: bool,
}

impl DeflateDecoder {
    /// Create a decoder
    pub fn new() -> Self {
        Self {
            inner: Decompress::new(false),
            pending: Vec::with_capacity(SINK_WINDOW),
            finishing: false,
            done: false,
        }
    }
}

impl Default for DeflateDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for DeflateDecoder {
    fn reset(&mut self) {
        self.inner.reset(false);
        self.pending.clear();
        self.finishing = false;
        self.done = false;
    }

    fn sink(&mut self, input: &[u8]) -> Result<usize, PacketError> {
        if self.finishing {
            return Err(PacketError::Codec("sink after finish".to_string()));
        }
        let take = input.len().min(SINK_WINDOW - self.pending.len());
        self.pending.extend_from_slice(&input[..take]);
        Ok(take)
    }

    fn poll(&mut self, output: &mut [u8]) -> Result<PollResult, PacketError> {
        if self.done || output.is_empty() {
            return Ok(PollResult::new(0, !self.done && self.finishing));
        }

        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();
        // Finish flush is never used here: miniz treats it as a one-shot
        // request that must fit the whole output in a single call.
        let status = self
            .inner
            .decompress(&self.pending, output, FlushDecompress::None)
            .map_err(|e| PacketError::Codec(e.to_string()))?;
        let consumed = (self.inner.total_in() - before_in) as usize;
        let produced = (self.inner.total_out() - before_out) as usize;
        self.pending.drain(..consumed);

        if status == Status::StreamEnd {
            self.done = true;
        }

        let more = if self.finishing {
            !self.done && (produced > 0 || consumed > 0)
        } else {
            produced == output.len() && !self.done
        };
        Ok(PollResult::new(produced, more))
    }

    fn finish(&mut self) -> Result<bool, PacketError> {
        self.finishing = true;
        Ok(!self.done)
    }
}
