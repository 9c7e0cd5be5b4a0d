//! Incremental compression adapter contract
//!
//! The framing layer does not compress anything itself. It drives an
//! external streaming codec through a small sink/poll/finish protocol:
//!
//! 1. `sink` hands the codec as much input as it will take
//! 2. `poll` is called until it reports no more pending output
//! 3. once all input is sunk, `finish` flushes the stream and `poll` is
//!    drained again, until `finish` reports nothing pending
//!
//! [`pump`] runs that loop with hard progress checks. Every iteration must
//! consume input or produce output, and output can never grow past the
//! target slice, so a misbehaving codec yields an error instead of a hang.
//!
//! Codec state is always owned by the caller and passed in per call.

#[cfg(feature = "deflate")]
pub mod deflate;

use crate::error::PacketError;

#[cfg(feature = "logging")]
use tracing::trace;

/// Outcome of a single [`CompressionAdapter::poll`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollResult {
    /// Bytes written into the output slice
    pub produced: usize,

    /// The codec has more output pending
    pub more: bool,
}

impl PollResult {
    /// Create a poll result
    pub const fn new(produced: usize, more: bool) -> Self {
        Self { produced, more }
    }
}

/// An incremental encoder or decoder with a sink/poll/finish interface
pub trait CompressionAdapter {
    /// Return the codec to its initial state
    fn reset(&mut self);

    /// Offer input to the codec, returning how many bytes it accepted
    fn sink(&mut self, input: &[u8]) -> Result<usize, PacketError>;

    /// Move pending output into `output`
    fn poll(&mut self, output: &mut [u8]) -> Result<PollResult, PacketError>;

    /// Signal end of input, returning whether output is still pending.
    ///
    /// May be called repeatedly; each call reports the current state.
    fn finish(&mut self) -> Result<bool, PacketError>;
}

impl<C: CompressionAdapter + ?Sized> CompressionAdapter for &mut C {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn sink(&mut self, input: &[u8]) -> Result<usize, PacketError> {
        (**self).sink(input)
    }

    fn poll(&mut self, output: &mut [u8]) -> Result<PollResult, PacketError> {
        (**self).poll(output)
    }

    fn finish(&mut self) -> Result<bool, PacketError> {
        (**self).finish()
    }
}

/// Reset `codec` and run all of `input` through it into `output`.
///
/// Returns the number of bytes written to `output`. Fails with
/// [`PacketError::OutputOverflow`] when the codec has more output than
/// `output` can hold and [`PacketError::CompressionStalled`] when an
/// iteration makes no progress.
pub fn pump<C>(codec: &mut C, input: &[u8], output: &mut [u8]) -> Result<usize, PacketError>
where
    C: CompressionAdapter + ?Sized,
{
    codec.reset();

    let mut sunk = 0;
    let mut written = 0;

    while sunk < input.len() {
        let consumed = codec.sink(&input[sunk..])?;
        if consumed > input.len() - sunk {
            return Err(PacketError::Codec(alloc::format!(
                "sink accepted {} of {} bytes",
                consumed,
                input.len() - sunk
            )));
        }
        sunk += consumed;

        let produced = drain(codec, output, &mut written, "sink")?;
        if consumed == 0 && produced == 0 {
            return Err(PacketError::CompressionStalled("sink"));
        }
    }

    let mut more = codec.finish()?;
    while more {
        let produced = drain(codec, output, &mut written, "finish")?;
        more = codec.finish()?;
        if more && produced == 0 {
            return Err(PacketError::CompressionStalled("finish"));
        }
    }

    #[cfg(feature = "logging")]
    trace!("Pumped {} bytes into {} bytes", input.len(), written);

    Ok(written)
}

/// Poll until the codec reports no pending output, returning bytes produced
fn drain<C>(
    codec: &mut C,
    output: &mut [u8],
    written: &mut usize,
    stage: &'static str,
) -> Result<usize, PacketError>
where
    C: CompressionAdapter + ?Sized,
{
    let start = *written;

    loop {
        if *written == output.len() {
            // Output is full; any further byte would overflow it
            let mut spare = [0u8; 1];
            let poll = codec.poll(&mut spare)?;
            if poll.produced > 0 {
                return Err(PacketError::OutputOverflow {
                    capacity: output.len(),
                });
            }
            if poll.more {
                return Err(PacketError::CompressionStalled(stage));
            }
            return Ok(*written - start);
        }

        let remaining = output.len() - *written;
        let poll = codec.poll(&mut output[*written..])?;
        if poll.produced > remaining {
            return Err(PacketError::Codec(alloc::format!(
                "poll produced {} bytes into a {} byte slice",
                poll.produced,
                remaining
            )));
        }
        *written += poll.produced;

        if !poll.more {
            return Ok(*written - start);
        }
        if poll.produced == 0 {
            return Err(PacketError::CompressionStalled(stage));
        }
    }
}
