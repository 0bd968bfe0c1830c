//! Pixel format descriptors.
//!
//! A [`PixelSpec`] pairs a [`ChannelLayout`] with a [`SampleType`]. Only the
//! 17 combinations in the format table are legal; [`descriptor_for`] is the
//! single place that decides legality and hands out the byte-layout facts
//! ([`FormatInfo`]) every other module relies on.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Descriptor enums
// ---------------------------------------------------------------------------

/// Storage type of one channel value.
///
/// Integer types are unsigned and full-range (`0..=2^n-1`). Float types hold
/// linear-light values where `0.0` is black and `1.0` reference white; they
/// may exceed `1.0` or go negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    /// 8-bit unsigned integer.
    U8,
    /// 10-bit unsigned integer, packed three per 32-bit word (`RGB` only).
    U10,
    /// 16-bit unsigned integer.
    U16,
    /// 16-bit IEEE half float.
    F16,
    /// 32-bit IEEE float.
    F32,
}

impl SampleType {
    /// All sample types in table order.
    pub const ALL: [SampleType; 5] = [
        SampleType::U8,
        SampleType::U10,
        SampleType::U16,
        SampleType::F16,
        SampleType::F32,
    ];

    /// Bytes used to hold one unpacked component.
    ///
    /// `U10` components unpack into 16-bit storage; packed `RGB U10` pixels
    /// are special-cased by [`FormatInfo::bytes_per_pixel`].
    #[inline]
    pub const fn byte_size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U10 | Self::U16 | Self::F16 => 2,
            Self::F32 => 4,
        }
    }

    /// Significant bits per component.
    #[inline]
    pub const fn bit_depth(self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U10 => 10,
            Self::U16 | Self::F16 => 16,
            Self::F32 => 32,
        }
    }

    /// Whether this is an unsigned integer type.
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::U8 | Self::U10 | Self::U16)
    }

    /// Whether this is a floating-point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        !self.is_integer()
    }

    /// Full-scale integer value (`2^n - 1`), or `None` for float types.
    #[inline]
    pub const fn max_value(self) -> Option<u32> {
        match self {
            Self::U8 => Some(255),
            Self::U10 => Some(1023),
            Self::U16 => Some(65535),
            Self::F16 | Self::F32 => None,
        }
    }

    /// Short label (`"U8"`, `"F16"`, ...).
    pub const fn label(self) -> &'static str {
        match self {
            Self::U8 => "U8",
            Self::U10 => "U10",
            Self::U16 => "U16",
            Self::F16 => "F16",
            Self::F32 => "F32",
        }
    }
}

/// Number and meaning of channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelLayout {
    /// Luminance.
    L,
    /// Luminance, alpha.
    La,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
}

impl ChannelLayout {
    /// All layouts in table order.
    pub const ALL: [ChannelLayout; 4] = [
        ChannelLayout::L,
        ChannelLayout::La,
        ChannelLayout::Rgb,
        ChannelLayout::Rgba,
    ];

    /// Number of channels in this layout.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::L => 1,
            Self::La => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Number of non-alpha channels.
    #[inline]
    pub const fn color_channels(self) -> usize {
        match self {
            Self::L | Self::La => 1,
            Self::Rgb | Self::Rgba => 3,
        }
    }

    /// Whether this layout includes an alpha channel.
    #[inline]
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::La | Self::Rgba)
    }

    /// Layout with the given channel count.
    pub const fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(Self::L),
            2 => Some(Self::La),
            3 => Some(Self::Rgb),
            4 => Some(Self::Rgba),
            _ => None,
        }
    }

    /// Short label (`"L"`, `"LA"`, `"RGB"`, `"RGBA"`).
    pub const fn label(self) -> &'static str {
        match self {
            Self::L => "L",
            Self::La => "LA",
            Self::Rgb => "RGB",
            Self::Rgba => "RGBA",
        }
    }
}

// ---------------------------------------------------------------------------
// PixelSpec
// ---------------------------------------------------------------------------

/// Channel layout + sample type pair describing a buffer's memory layout.
///
/// Construction is unchecked so specs can be written as constants and read
/// from configuration; [`descriptor_for`] rejects illegal pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PixelSpec {
    /// Channel layout.
    pub layout: ChannelLayout,
    /// Sample storage type.
    pub sample: SampleType,
}

impl PixelSpec {
    /// Pair a layout with a sample type (no validation).
    pub const fn new(layout: ChannelLayout, sample: SampleType) -> Self {
        Self { layout, sample }
    }

    // Named constants ---------------------------------------------------------

    /// 8-bit luminance.
    pub const L_U8: Self = Self::new(ChannelLayout::L, SampleType::U8);
    /// 16-bit luminance.
    pub const L_U16: Self = Self::new(ChannelLayout::L, SampleType::U16);
    /// Half-float luminance.
    pub const L_F16: Self = Self::new(ChannelLayout::L, SampleType::F16);
    /// Float luminance.
    pub const L_F32: Self = Self::new(ChannelLayout::L, SampleType::F32);
    /// 8-bit luminance + alpha.
    pub const LA_U8: Self = Self::new(ChannelLayout::La, SampleType::U8);
    /// 16-bit luminance + alpha.
    pub const LA_U16: Self = Self::new(ChannelLayout::La, SampleType::U16);
    /// Half-float luminance + alpha.
    pub const LA_F16: Self = Self::new(ChannelLayout::La, SampleType::F16);
    /// Float luminance + alpha.
    pub const LA_F32: Self = Self::new(ChannelLayout::La, SampleType::F32);
    /// 8-bit RGB.
    pub const RGB_U8: Self = Self::new(ChannelLayout::Rgb, SampleType::U8);
    /// 10-bit RGB packed into one 32-bit word per pixel.
    pub const RGB_U10: Self = Self::new(ChannelLayout::Rgb, SampleType::U10);
    /// 16-bit RGB.
    pub const RGB_U16: Self = Self::new(ChannelLayout::Rgb, SampleType::U16);
    /// Half-float RGB.
    pub const RGB_F16: Self = Self::new(ChannelLayout::Rgb, SampleType::F16);
    /// Float RGB.
    pub const RGB_F32: Self = Self::new(ChannelLayout::Rgb, SampleType::F32);
    /// 8-bit RGBA.
    pub const RGBA_U8: Self = Self::new(ChannelLayout::Rgba, SampleType::U8);
    /// 16-bit RGBA.
    pub const RGBA_U16: Self = Self::new(ChannelLayout::Rgba, SampleType::U16);
    /// Half-float RGBA.
    pub const RGBA_F16: Self = Self::new(ChannelLayout::Rgba, SampleType::F16);
    /// Float RGBA.
    pub const RGBA_F32: Self = Self::new(ChannelLayout::Rgba, SampleType::F32);

    /// Every legal spec, in format-table order.
    pub const ALL: [PixelSpec; 17] = [
        Self::L_U8,
        Self::L_U16,
        Self::L_F16,
        Self::L_F32,
        Self::LA_U8,
        Self::LA_U16,
        Self::LA_F16,
        Self::LA_F32,
        Self::RGB_U8,
        Self::RGB_U10,
        Self::RGB_U16,
        Self::RGB_F16,
        Self::RGB_F32,
        Self::RGBA_U8,
        Self::RGBA_U16,
        Self::RGBA_F16,
        Self::RGBA_F32,
    ];

    // Methods -----------------------------------------------------------------

    /// Pick the legal spec matching a decoder's header fields.
    ///
    /// Integer depths 8 and 16 work for every channel count, 10 only for
    /// three channels. Floating point accepts 16 and 32 bits.
    pub fn from_parts(channels: usize, bit_depth: u32, floating_point: bool) -> Result<Self> {
        let layout = ChannelLayout::from_channels(channels)
            .ok_or_else(|| Error::UnknownLabel(alloc_label(channels, bit_depth, floating_point)))?;
        let sample = match (bit_depth, floating_point) {
            (8, false) => SampleType::U8,
            (10, false) => SampleType::U10,
            (16, false) => SampleType::U16,
            (16, true) => SampleType::F16,
            (32, true) => SampleType::F32,
            _ => {
                return Err(Error::UnknownLabel(alloc_label(
                    channels,
                    bit_depth,
                    floating_point,
                )));
            }
        };
        let spec = Self::new(layout, sample);
        descriptor_for(spec)?;
        Ok(spec)
    }

    /// Byte-layout facts, or `UnsupportedFormat` for an illegal pair.
    #[inline]
    pub fn info(self) -> Result<FormatInfo> {
        descriptor_for(self)
    }

    /// Whether this pair is one of the 17 legal specs.
    #[inline]
    pub fn is_legal(self) -> bool {
        descriptor_for(self).is_ok()
    }

    /// Number of channels.
    #[inline]
    pub const fn channel_count(self) -> usize {
        self.layout.channels()
    }

    /// Same layout with a different sample type (not validated).
    #[inline]
    pub const fn with_sample(self, sample: SampleType) -> Self {
        Self::new(self.layout, sample)
    }

    /// Same sample type with a different layout (not validated).
    #[inline]
    pub const fn with_layout(self, layout: ChannelLayout) -> Self {
        Self::new(layout, self.sample)
    }
}

fn alloc_label(channels: usize, bit_depth: u32, floating_point: bool) -> String {
    let kind = if floating_point { "float" } else { "int" };
    format!("{channels} channels, {bit_depth}-bit {kind}")
}

// ---------------------------------------------------------------------------
// FormatInfo / descriptor_for
// ---------------------------------------------------------------------------

/// Byte-layout facts for one legal [`PixelSpec`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormatInfo {
    /// Channels per pixel.
    pub channel_count: usize,
    /// Bytes per unpacked component.
    pub bytes_per_component: usize,
    /// Bytes per pixel; 4 for packed `RGB U10`.
    pub bytes_per_pixel: usize,
    /// Integer (as opposed to float) samples.
    pub is_integer: bool,
    /// Components share storage words (`RGB U10`).
    pub is_packed: bool,
}

impl FormatInfo {
    pub(crate) const fn table(channel_count: usize, sample: SampleType) -> Self {
        let packed = matches!(sample, SampleType::U10);
        Self {
            channel_count,
            bytes_per_component: sample.byte_size(),
            bytes_per_pixel: if packed {
                4
            } else {
                channel_count * sample.byte_size()
            },
            is_integer: sample.is_integer(),
            is_packed: packed,
        }
    }

    /// Bytes in one tightly packed scanline of `width` pixels, or `None` on overflow.
    #[inline]
    pub const fn bytes_per_scanline(&self, width: u32) -> Option<usize> {
        (width as usize).checked_mul(self.bytes_per_pixel)
    }
}

/// Look up the byte-layout facts for `spec`.
///
/// # Errors
///
/// [`Error::UnsupportedFormat`] unless `spec` is one of [`PixelSpec::ALL`].
pub fn descriptor_for(spec: PixelSpec) -> Result<FormatInfo> {
    let channels = spec.layout.channels();
    match (spec.layout, spec.sample) {
        (ChannelLayout::Rgb, SampleType::U10) => Ok(FormatInfo::table(channels, SampleType::U10)),
        (_, SampleType::U10) => Err(Error::UnsupportedFormat {
            layout: spec.layout,
            sample: spec.sample,
        }),
        (_, sample) => Ok(FormatInfo::table(channels, sample)),
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for PixelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.layout, self.sample)
    }
}

impl FromStr for SampleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownLabel(s.to_owned()))
    }
}

impl FromStr for ChannelLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownLabel(s.to_owned()))
    }
}

/// Parses `"RGB U8"`, `"rgb_u8"`, `"RGBA-F16"` and similar.
impl FromStr for PixelSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s
            .split(|c: char| c == ' ' || c == '_' || c == '-')
            .filter(|p| !p.is_empty());
        let (Some(layout), Some(sample), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::UnknownLabel(s.to_owned()));
        };
        let spec = Self::new(layout.parse()?, sample.parse()?);
        descriptor_for(spec)?;
        Ok(spec)
    }
}

impl From<PixelSpec> for String {
    fn from(spec: PixelSpec) -> Self {
        spec.to_string()
    }
}

impl TryFrom<String> for PixelSpec {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
