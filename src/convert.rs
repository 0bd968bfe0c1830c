//! Any-to-any pixel conversion.
//!
//! [`convert`] fills a pre-sized destination from a source of the same
//! dimensions. Each pixel goes through two steps:
//!
//! 1. **Channel mapping.** `L` replicates into `R, G, B`; alpha is dropped or
//!    added (fully opaque) as the destination requires. Reducing `RGB` to `L`
//!    discards information and needs an explicit [`ChannelReduction`].
//! 2. **Sample conversion** using the rules in [`crate::sample`]. Packed
//!    `RGB U10` goes through [`crate::bitpack`].
//!
//! Source and destination are distinct buffers; the borrow checker rules out
//! aliasing.

use serde::{Deserialize, Serialize};

use crate::bitpack::{pack10, unpack10};
use crate::buffer::{PixelBuffer, ProxyScale};
use crate::error::{Error, Result};
use crate::format::{FormatInfo, PixelSpec, descriptor_for};
use crate::sample::{self, Value};

/// Rec.709 luma weights for [`ChannelReduction::Luminance`].
pub const REC709_LUMA: [f64; 3] = [0.2126, 0.7152, 0.0722];

/// How to fold three color channels into one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ChannelReduction {
    /// Refuse with [`Error::LossyChannelReduction`].
    #[default]
    Reject,
    /// Unweighted mean `(r + g + b) / 3`.
    Average,
    /// Rec.709 weighted sum, see [`REC709_LUMA`].
    Luminance,
}

/// Conversion options. The default matches plain [`convert`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ConvertOptions {
    /// Opt-in for `RGB(A)` to `L(A)` conversions.
    pub channel_reduction: ChannelReduction,
    /// Write color channels in blue, green, red order.
    pub bgr: bool,
}

impl ConvertOptions {
    /// Default options.
    pub const fn new() -> Self {
        Self {
            channel_reduction: ChannelReduction::Reject,
            bgr: false,
        }
    }

    /// Set the channel reduction mode.
    pub const fn with_channel_reduction(mut self, reduction: ChannelReduction) -> Self {
        self.channel_reduction = reduction;
        self
    }

    /// Set BGR(A) output order.
    pub const fn with_bgr(mut self, bgr: bool) -> Self {
        self.bgr = bgr;
        self
    }
}

// ---------------------------------------------------------------------------
// Buffer-level entry points
// ---------------------------------------------------------------------------

/// Convert `src` into `dst`'s spec with default options.
///
/// # Errors
///
/// [`Error::DestinationSizeMismatch`] if the dimensions differ,
/// [`Error::LossyChannelReduction`] for `RGB(A)` to `L(A)`.
pub fn convert(src: &PixelBuffer, dst: &mut PixelBuffer) -> Result<()> {
    convert_with(src, dst, &ConvertOptions::default())
}

/// Convert `src` into `dst`'s spec.
///
/// # Errors
///
/// As [`convert`]; a non-`Reject` [`ChannelReduction`] permits color
/// reduction.
pub fn convert_with(src: &PixelBuffer, dst: &mut PixelBuffer, options: &ConvertOptions) -> Result<()> {
    if src.width() != dst.width() || src.height() != dst.height() {
        return Err(Error::DestinationSizeMismatch {
            src_width: src.width(),
            src_height: src.height(),
            dst_width: dst.width(),
            dst_height: dst.height(),
        });
    }
    let (src_spec, dst_spec) = (src.spec(), dst.spec());
    check_reduction(src_spec, dst_spec, options)?;
    tracing::debug!(
        width = src.width(),
        height = src.height(),
        from = %src_spec,
        to = %dst_spec,
        bgr = options.bgr,
        "converting pixel buffer"
    );
    let (src_info, dst_info) = (src.info(), dst.info());
    convert_pixels(
        src.as_bytes(),
        src_spec,
        &src_info,
        dst.as_bytes_mut(),
        dst_spec,
        &dst_info,
        options,
    );
    Ok(())
}

/// Allocate a buffer in `spec` and convert `src` into it.
///
/// # Errors
///
/// As [`PixelBuffer::new`] and [`convert_with`].
pub fn convert_to(src: &PixelBuffer, spec: PixelSpec, options: &ConvertOptions) -> Result<PixelBuffer> {
    check_reduction(src.spec(), spec, options)?;
    let mut dst = PixelBuffer::new(src.width(), src.height(), spec)?
        .with_proxy(src.proxy())
        .with_mirror(src.mirror());
    convert_with(src, &mut dst, options)?;
    Ok(dst)
}

/// Convert one packed scanline of `width` pixels between specs.
///
/// Decoders use this to convert row by row straight out of a file's native
/// layout.
///
/// # Errors
///
/// [`Error::UnsupportedFormat`] for an illegal spec, [`Error::LengthMismatch`]
/// if either slice is not exactly `width` pixels, and
/// [`Error::LossyChannelReduction`] as for [`convert`].
pub fn convert_scanline(
    src: &[u8],
    src_spec: PixelSpec,
    dst: &mut [u8],
    dst_spec: PixelSpec,
    width: u32,
    options: &ConvertOptions,
) -> Result<()> {
    let src_info = descriptor_for(src_spec)?;
    let dst_info = descriptor_for(dst_spec)?;
    check_reduction(src_spec, dst_spec, options)?;
    for (info, len) in [(&src_info, src.len()), (&dst_info, dst.len())] {
        let expected = width as usize * info.bytes_per_pixel;
        if len != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: len,
            });
        }
    }
    convert_pixels(src, src_spec, &src_info, dst, dst_spec, &dst_info, options);
    Ok(())
}

/// Build a proxy of `src` in `dst`, converting as pixels are sampled.
///
/// Every `factor`th pixel of every `factor`th row is taken, starting at the
/// top-left, so `dst` must be [`ProxyScale::scale_size`] of the source. The
/// destination records `proxy` as its proxy level.
///
/// # Errors
///
/// [`Error::DestinationSizeMismatch`] if `dst` is not the proxy size, and
/// [`Error::LossyChannelReduction`] as for [`convert`].
pub fn convert_proxy(
    src: &PixelBuffer,
    dst: &mut PixelBuffer,
    proxy: ProxyScale,
    options: &ConvertOptions,
) -> Result<()> {
    let (width, height) = proxy.scale_size(src.width(), src.height());
    if width != dst.width() || height != dst.height() {
        return Err(Error::DestinationSizeMismatch {
            src_width: width,
            src_height: height,
            dst_width: dst.width(),
            dst_height: dst.height(),
        });
    }
    let (src_spec, dst_spec) = (src.spec(), dst.spec());
    check_reduction(src_spec, dst_spec, options)?;
    tracing::debug!(
        width = src.width(),
        height = src.height(),
        factor = proxy.factor(),
        from = %src_spec,
        to = %dst_spec,
        "building proxy"
    );
    let factor = proxy.factor();
    let (src_info, dst_info) = (src.info(), dst.info());
    let step = factor as usize * src_info.bytes_per_pixel;
    for y in 0..height {
        let row = src.scanline(y * factor)?;
        let out = dst.scanline_mut(y)?;
        for (x, d) in out.chunks_exact_mut(dst_info.bytes_per_pixel).enumerate() {
            let s = &row[x * step..x * step + src_info.bytes_per_pixel];
            convert_pixels(s, src_spec, &src_info, d, dst_spec, &dst_info, options);
        }
    }
    dst.set_proxy(proxy);
    dst.set_mirror(src.mirror());
    Ok(())
}

fn check_reduction(src: PixelSpec, dst: PixelSpec, options: &ConvertOptions) -> Result<()> {
    let reduces = src.layout.color_channels() > dst.layout.color_channels();
    if reduces && options.channel_reduction == ChannelReduction::Reject {
        return Err(Error::LossyChannelReduction {
            from: src.layout,
            to: dst.layout,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pixel loop
// ---------------------------------------------------------------------------

/// Channels of one pixel in canonical order: color first, then alpha.
struct Pixel {
    color: [Value; 3],
    colors: usize,
    alpha: Option<Value>,
}

/// Read every component of one pixel; unused slots stay opaque.
pub(crate) fn load_values(px: &[u8], spec: PixelSpec, info: &FormatInfo) -> [Value; 4] {
    let mut values = [Value::OPAQUE; 4];
    if info.is_packed {
        let rgb = unpack10(u32::from_ne_bytes([px[0], px[1], px[2], px[3]]));
        for (v, c) in values.iter_mut().zip(rgb) {
            *v = Value::Int {
                value: u32::from(c),
                max: 1023,
            };
        }
    } else {
        for (v, bytes) in values.iter_mut().zip(px.chunks_exact(info.bytes_per_component)) {
            *v = sample::load(bytes, spec.sample);
        }
    }
    values
}

fn load_pixel(px: &[u8], spec: PixelSpec, info: &FormatInfo) -> Pixel {
    let values = load_values(px, spec, info);
    let colors = spec.layout.color_channels();
    Pixel {
        color: [values[0], values[1], values[2]],
        colors,
        alpha: spec.layout.has_alpha().then_some(values[colors]),
    }
}

fn reduce(color: &[Value; 3], mode: ChannelReduction) -> Value {
    let [r, g, b] = color.map(|v| f64::from(v.to_f32()));
    let y = match mode {
        ChannelReduction::Reject | ChannelReduction::Average => (r + g + b) / 3.0,
        ChannelReduction::Luminance => {
            REC709_LUMA[0] * r + REC709_LUMA[1] * g + REC709_LUMA[2] * b
        }
    };
    Value::Float(y as f32)
}

fn map_channels(src: &Pixel, dst_spec: PixelSpec, options: &ConvertOptions) -> [Value; 4] {
    let mut out = [Value::OPAQUE; 4];
    let colors = dst_spec.layout.color_channels();
    match (src.colors, colors) {
        (1, 3) => out[..3].fill(src.color[0]),
        (3, 1) => out[0] = reduce(&src.color, options.channel_reduction),
        _ => out[..colors].copy_from_slice(&src.color[..colors]),
    }
    if options.bgr && colors == 3 {
        out.swap(0, 2);
    }
    if dst_spec.layout.has_alpha() {
        out[colors] = src.alpha.unwrap_or(Value::OPAQUE);
    }
    out
}

/// Write the first `channel_count` values of one pixel.
pub(crate) fn store_pixel(values: &[Value; 4], spec: PixelSpec, info: &FormatInfo, px: &mut [u8]) {
    if info.is_packed {
        let c = |i: usize| values[i].to_int(1023) as u16;
        px.copy_from_slice(&pack10([c(0), c(1), c(2)]).to_ne_bytes());
        return;
    }
    for (v, bytes) in values.iter().zip(px.chunks_exact_mut(info.bytes_per_component)) {
        sample::store(*v, spec.sample, bytes);
    }
}

/// Convert every pixel; slices must already be validated to the same pixel count.
pub(crate) fn convert_pixels(
    src: &[u8],
    src_spec: PixelSpec,
    src_info: &FormatInfo,
    dst: &mut [u8],
    dst_spec: PixelSpec,
    dst_info: &FormatInfo,
    options: &ConvertOptions,
) {
    if src_spec == dst_spec && !options.bgr {
        dst.copy_from_slice(src);
        return;
    }
    if src_info.bytes_per_pixel == 0 || dst_info.bytes_per_pixel == 0 {
        return;
    }
    let pixels = src
        .chunks_exact(src_info.bytes_per_pixel)
        .zip(dst.chunks_exact_mut(dst_info.bytes_per_pixel));
    for (s, d) in pixels {
        let px = load_pixel(s, src_spec, src_info);
        let mapped = map_channels(&px, dst_spec, options);
        store_pixel(&mapped, dst_spec, dst_info, d);
    }
}
