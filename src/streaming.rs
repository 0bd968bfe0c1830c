//! Scanline-level decode and encode.
//!
//! File-format codecs expose themselves to the viewer through two small
//! capability traits. A decoder is opened on encoded bytes and pulls one
//! scanline at a time into a caller buffer; an encoder is opened with the
//! image dimensions and receives scanlines top to bottom:
//!
//! ```text
//! let mut decoder = RleRowDecoder::open(data, w, h, PixelSpec::RGB_U8, RleScheme::TARGA)?;
//! let image = decode_to_buffer(&mut decoder, &stop)?;
//!
//! let encoder = RleRowEncoder::open(w, h, PixelSpec::RGB_U8, RleScheme::TARGA)?;
//! let bytes = encode_buffer(encoder, &image, &stop)?;
//! ```
//!
//! The drivers check the [`Stop`] token between scanlines. Codec calls
//! themselves run to completion.

use enough::Stop;

use crate::buffer::{Mirror, PixelBuffer, alloc_zeroed};
use crate::convert::{ConvertOptions, convert_scanline, convert_to};
use crate::error::{Error, Result};
use crate::format::{FormatInfo, PixelSpec, descriptor_for};
use crate::rle::RleScheme;

// ===========================================================================
// Traits
// ===========================================================================

/// Pull-based scanline decoder.
///
/// Rows come out top to bottom. Each call fills exactly one packed scanline
/// of [`spec`](Self::spec) pixels.
pub trait ScanlineDecoder {
    /// Codec error; core failures convert into it.
    type Error: core::error::Error + From<Error>;

    /// Pixel spec of decoded scanlines.
    fn spec(&self) -> PixelSpec;

    /// Image width in pixels.
    fn width(&self) -> u32;

    /// Image height in pixels.
    fn height(&self) -> u32;

    /// Rows not yet decoded.
    fn rows_remaining(&self) -> u32;

    /// How the decoded rows are mirrored, e.g. bottom-up storage.
    fn mirror(&self) -> Mirror {
        Mirror::NONE
    }

    /// Decode the next scanline into `dst` (`width * bytes_per_pixel` bytes).
    fn decode_scanline(&mut self, dst: &mut [u8]) -> core::result::Result<(), Self::Error>;
}

/// Push-based scanline encoder.
///
/// Exactly [`height`](Self::height) scanlines must be pushed before
/// [`finish`](Self::finish).
pub trait ScanlineEncoder {
    /// Codec error; core failures convert into it.
    type Error: core::error::Error + From<Error>;
    /// Finished encoding, e.g. the file bytes.
    type Output;

    /// Pixel spec the encoder accepts.
    fn spec(&self) -> PixelSpec;

    /// Image width in pixels.
    fn width(&self) -> u32;

    /// Image height in pixels.
    fn height(&self) -> u32;

    /// Encode the next scanline.
    fn encode_scanline(&mut self, src: &[u8]) -> core::result::Result<(), Self::Error>;

    /// Flush and return the encoded output.
    fn finish(self) -> core::result::Result<Self::Output, Self::Error>;
}

// ===========================================================================
// RLE scanline codec
// ===========================================================================

/// Validates that `spec` can be run-length coded per pixel and returns
/// `(info, sample_width, channels)`.
fn rle_layout(spec: PixelSpec) -> Result<(FormatInfo, usize, usize)> {
    let info = descriptor_for(spec)?;
    if info.is_packed || info.bytes_per_component > 2 {
        return Err(Error::InvalidRleParameters {
            sample_width: info.bytes_per_component,
            channels: info.channel_count,
        });
    }
    Ok((info, info.bytes_per_component, info.channel_count))
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::LengthMismatch { expected, actual });
    }
    Ok(())
}

/// Decodes images stored as one RLE record set per scanline, with whole
/// pixels as the repeat unit.
#[derive(Clone, Debug)]
pub struct RleRowDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    scheme: RleScheme,
    width: u32,
    height: u32,
    spec: PixelSpec,
    info: FormatInfo,
    row: u32,
    mirror: Mirror,
}

impl<'a> RleRowDecoder<'a> {
    /// Open a decoder over the encoded pixel data (header already stripped).
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] for an illegal spec,
    /// [`Error::InvalidRleParameters`] for `RGB U10` and 32-bit samples.
    pub fn open(
        data: &'a [u8],
        width: u32,
        height: u32,
        spec: PixelSpec,
        scheme: RleScheme,
    ) -> Result<Self> {
        let (info, ..) = rle_layout(spec)?;
        tracing::debug!(width, height, %spec, bytes = data.len(), "opened RLE decoder");
        Ok(Self {
            data,
            pos: 0,
            scheme,
            width,
            height,
            spec,
            info,
            row: 0,
            mirror: Mirror::NONE,
        })
    }

    /// Report the stored row and column order, e.g. [`Mirror::VERTICAL`] for
    /// a bottom-up file.
    pub fn with_mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = mirror;
        self
    }

    /// Encoded bytes consumed so far.
    pub fn bytes_consumed(&self) -> usize {
        self.pos
    }
}

impl ScanlineDecoder for RleRowDecoder<'_> {
    type Error = Error;

    fn spec(&self) -> PixelSpec {
        self.spec
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn rows_remaining(&self) -> u32 {
        self.height - self.row
    }

    fn mirror(&self) -> Mirror {
        self.mirror
    }

    fn decode_scanline(&mut self, dst: &mut [u8]) -> Result<()> {
        if self.row >= self.height {
            return Err(Error::OutOfRange {
                x: 0,
                y: self.row,
                width: self.width,
                height: self.height,
            });
        }
        check_len(self.width as usize * self.info.bytes_per_pixel, dst.len())?;
        let consumed = self.scheme.decode(
            &self.data[self.pos..],
            dst,
            self.width as usize,
            self.info.bytes_per_component,
            self.info.channel_count,
        )?;
        tracing::trace!(row = self.row, consumed, "decoded RLE scanline");
        self.pos += consumed;
        self.row += 1;
        Ok(())
    }
}

/// Encodes scanlines as one RLE record set each.
#[derive(Clone, Debug)]
pub struct RleRowEncoder {
    out: Vec<u8>,
    scratch: Vec<u8>,
    scheme: RleScheme,
    width: u32,
    height: u32,
    spec: PixelSpec,
    info: FormatInfo,
    row: u32,
}

impl RleRowEncoder {
    /// Open an encoder for a `width x height` image.
    ///
    /// # Errors
    ///
    /// As [`RleRowDecoder::open`].
    pub fn open(width: u32, height: u32, spec: PixelSpec, scheme: RleScheme) -> Result<Self> {
        let (info, sample_width, channels) = rle_layout(spec)?;
        let too_big = Error::AllocationFailed {
            width,
            height: 1,
            spec,
        };
        let len = scheme
            .max_encoded_len(width as usize, sample_width, channels)
            .ok_or(too_big)?;
        let scratch = alloc_zeroed(len, width, 1, spec)?;
        tracing::debug!(width, height, %spec, "opened RLE encoder");
        Ok(Self {
            out: Vec::new(),
            scratch,
            scheme,
            width,
            height,
            spec,
            info,
            row: 0,
        })
    }
}

impl ScanlineEncoder for RleRowEncoder {
    type Error = Error;
    type Output = Vec<u8>;

    fn spec(&self) -> PixelSpec {
        self.spec
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn encode_scanline(&mut self, src: &[u8]) -> Result<()> {
        if self.row >= self.height {
            return Err(Error::OutOfRange {
                x: 0,
                y: self.row,
                width: self.width,
                height: self.height,
            });
        }
        check_len(self.width as usize * self.info.bytes_per_pixel, src.len())?;
        let written = self.scheme.encode(
            src,
            &mut self.scratch,
            self.width as usize,
            self.info.bytes_per_component,
            self.info.channel_count,
        )?;
        tracing::trace!(row = self.row, written, "encoded RLE scanline");
        self.out.extend_from_slice(&self.scratch[..written]);
        self.row += 1;
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        if self.row != self.height {
            return Err(Error::TruncatedStream {
                produced: self.row as usize,
                expected: self.height as usize,
            });
        }
        tracing::debug!(bytes = self.out.len(), "finished RLE encoding");
        Ok(self.out)
    }
}

// ===========================================================================
// Drivers
// ===========================================================================

/// Decode the remaining scanlines of `decoder` into a new buffer.
///
/// Rows already consumed before the call stay zero. `stop` is checked before
/// each scanline.
///
/// # Errors
///
/// Allocation and decode errors, or [`Error::Stopped`] (converted into the
/// decoder's error type).
pub fn decode_to_buffer<D: ScanlineDecoder>(
    decoder: &mut D,
    stop: &dyn Stop,
) -> core::result::Result<PixelBuffer, D::Error> {
    let (width, height) = (decoder.width(), decoder.height());
    let mut buffer =
        PixelBuffer::new(width, height, decoder.spec())?.with_mirror(decoder.mirror());
    let first = height - decoder.rows_remaining().min(height);
    tracing::debug!(width, height, first, "decoding scanlines");
    for y in first..height {
        stop.check().map_err(Error::from)?;
        decoder.decode_scanline(buffer.scanline_mut(y)?)?;
    }
    Ok(buffer)
}

/// Decode the remaining scanlines, converting each into `spec` as it is read.
///
/// # Errors
///
/// As [`decode_to_buffer`], plus conversion errors.
pub fn decode_converted<D: ScanlineDecoder>(
    decoder: &mut D,
    spec: PixelSpec,
    options: &ConvertOptions,
    stop: &dyn Stop,
) -> core::result::Result<PixelBuffer, D::Error> {
    let (width, height, src_spec) = (decoder.width(), decoder.height(), decoder.spec());
    let mut buffer = PixelBuffer::new(width, height, spec)?.with_mirror(decoder.mirror());
    let mut row = PixelBuffer::new(width, 1, src_spec)?;
    let first = height - decoder.rows_remaining().min(height);
    tracing::debug!(width, height, from = %src_spec, to = %spec, "decoding and converting scanlines");
    for y in first..height {
        stop.check().map_err(Error::from)?;
        decoder.decode_scanline(row.as_bytes_mut())?;
        convert_scanline(row.as_bytes(), src_spec, buffer.scanline_mut(y)?, spec, width, options)?;
    }
    Ok(buffer)
}

/// Push every scanline of `buffer` into `encoder` and finish it.
///
/// A buffer in a different spec is converted with default options first.
///
/// # Errors
///
/// [`Error::DestinationSizeMismatch`] if the dimensions differ, conversion
/// and encode errors, or [`Error::Stopped`].
pub fn encode_buffer<E: ScanlineEncoder>(
    mut encoder: E,
    buffer: &PixelBuffer,
    stop: &dyn Stop,
) -> core::result::Result<E::Output, E::Error> {
    if buffer.width() != encoder.width() || buffer.height() != encoder.height() {
        return Err(Error::DestinationSizeMismatch {
            src_width: buffer.width(),
            src_height: buffer.height(),
            dst_width: encoder.width(),
            dst_height: encoder.height(),
        }
        .into());
    }
    let converted;
    let source = if buffer.spec() == encoder.spec() {
        buffer
    } else {
        converted = convert_to(buffer, encoder.spec(), &ConvertOptions::default())?;
        &converted
    };
    tracing::debug!(width = source.width(), height = source.height(), spec = %source.spec(), "encoding scanlines");
    for row in source.rows() {
        stop.check().map_err(Error::from)?;
        encoder.encode_scanline(row)?;
    }
    encoder.finish()
}
