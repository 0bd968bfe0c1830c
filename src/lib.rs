//! Pixel formats, conversion, and display transforms for image codecs.
//!
//! This crate is the numeric core a viewer's file-format plugins and renderer
//! share:
//!
//! - [`PixelSpec`] / [`descriptor_for`]: the 17 legal channel layout and
//!   sample type pairs and their byte layout
//! - [`PixelBuffer`]: owned, tightly packed, bounds-checked pixel storage
//! - [`convert`] / [`convert_with`]: any-to-any pixel conversion with
//!   documented rounding
//! - [`ColorProfile`] / [`apply`]: gamma, 1-D LUT and photographic exposure
//! - [`rle`] and [`bitpack`]: run-length coding (SGI, Targa, IFF framing) and
//!   10-bit DPX/Cineon packing
//! - [`ScanlineDecoder`] / [`ScanlineEncoder`]: row-level codec traits with
//!   cancellable drivers
//!
//! Every operation is synchronous and works only on the buffers passed in,
//! so independent buffers can be processed on any number of threads.

#![forbid(unsafe_code)]

pub mod bitpack;
mod buffer;
pub mod config;
mod convert;
mod error;
mod format;
mod profile;
pub mod rle;
pub mod sample;
mod streaming;

pub use buffer::{Mirror, PixelBuffer, ProxyScale, deinterleave_planes, interleave_planes};
pub use convert::{
    ChannelReduction, ConvertOptions, REC709_LUMA, convert, convert_proxy, convert_scanline,
    convert_to, convert_with,
};
pub use error::{Error, Result};
pub use format::{ChannelLayout, FormatInfo, PixelSpec, SampleType, descriptor_for};
pub use profile::{
    ColorProfile, EXPOSURE_GAIN_OFFSET, Exposure, KNEE_WHITE_STOPS, Transform, apply,
};
pub use rle::{RleScheme, rle_decode, rle_encode};
pub use streaming::{
    RleRowDecoder, RleRowEncoder, ScanlineDecoder, ScanlineEncoder, decode_converted,
    decode_to_buffer, encode_buffer,
};

// Re-exports for codec implementors and users.
pub use enough::{Stop, StopReason, Unstoppable};
pub use imgref::{Img, ImgRef, ImgVec};
pub use rgb;
pub use rgb::{Rgb, Rgba};
