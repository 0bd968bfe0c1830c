//! Error taxonomy shared by every operation in the crate.
//!
//! All failures are returned as typed values. Nothing is retried internally:
//! a caller that wants to try again (e.g. with a smaller proxy size after
//! [`Error::AllocationFailed`]) does so itself.

use enough::StopReason;

use crate::format::{ChannelLayout, PixelSpec, SampleType};

/// Errors from descriptor lookup, buffer access, codecs, and transforms.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The layout/sample combination is not one of the 17 legal pixel specs.
    #[error("unsupported pixel format {layout} {sample}")]
    UnsupportedFormat {
        /// Requested channel layout.
        layout: ChannelLayout,
        /// Requested sample type.
        sample: SampleType,
    },

    /// The buffer size overflows the address space or the allocator refused it.
    #[error("cannot allocate {width}x{height} {spec} buffer")]
    AllocationFailed {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
        /// Requested pixel spec.
        spec: PixelSpec,
    },

    /// Pixel or scanline address outside the buffer.
    #[error("({x}, {y}) is outside the {width}x{height} buffer")]
    OutOfRange {
        /// Requested column (0 for scanline access).
        x: u32,
        /// Requested row.
        y: u32,
        /// Buffer width.
        width: u32,
        /// Buffer height.
        height: u32,
    },

    /// The encoded stream ended before the expected number of units was produced.
    #[error("stream ended after {produced} of {expected} units")]
    TruncatedStream {
        /// Units decoded before the input ran out.
        produced: usize,
        /// Units the caller asked for.
        expected: usize,
    },

    /// A run would write past the destination capacity.
    #[error("write of {needed} exceeds output capacity of {capacity}")]
    OverrunStream {
        /// Size the write needed (units for decode, bytes for encode).
        needed: usize,
        /// Capacity available in the same unit.
        capacity: usize,
    },

    /// The conversion would discard color channels without an explicit opt-in.
    #[error("{from} to {to} discards color channels; choose a channel reduction")]
    LossyChannelReduction {
        /// Source layout.
        from: ChannelLayout,
        /// Destination layout.
        to: ChannelLayout,
    },

    /// Destination dimensions differ from the source.
    #[error("destination is {dst_width}x{dst_height}, source is {src_width}x{src_height}")]
    DestinationSizeMismatch {
        /// Source width.
        src_width: u32,
        /// Source height.
        src_height: u32,
        /// Destination width.
        dst_width: u32,
        /// Destination height.
        dst_height: u32,
    },

    /// A caller-supplied byte slice does not have the size its description requires.
    #[error("expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// RLE sample width must be 1 or 2 bytes and channel count non-zero.
    #[error("invalid RLE parameters: sample width {sample_width}, {channels} channels")]
    InvalidRleParameters {
        /// Bytes per sample.
        sample_width: usize,
        /// Samples per unit.
        channels: usize,
    },

    /// The color profile cannot be applied as described.
    #[error("invalid color profile: {0}")]
    InvalidProfile(&'static str),

    /// A pixel label could not be parsed.
    #[error("unknown pixel label {0:?}")]
    UnknownLabel(String),

    /// A stop token requested cancellation between scanlines.
    #[error("stopped: {0:?}")]
    Stopped(StopReason),
}

impl From<StopReason> for Error {
    fn from(reason: StopReason) -> Self {
        Self::Stopped(reason)
    }
}

/// Crate result alias.
pub type Result<T, E = Error> = core::result::Result<T, E>;
