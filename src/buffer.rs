//! Owned pixel storage.
//!
//! [`PixelBuffer`] is a tightly packed (`stride == width * bytes_per_pixel`)
//! byte buffer tagged with its [`PixelSpec`]. Multi-byte samples are stored in
//! host byte order; decoders fix endianness before building a buffer, or call
//! [`PixelBuffer::swap_endian`] afterwards.

use core::fmt;

use imgref::ImgRef;
use rgb::{FromSlice, Rgb, Rgba};

use crate::error::{Error, Result};
use crate::format::{FormatInfo, PixelSpec, SampleType, descriptor_for};

// ---------------------------------------------------------------------------
// ProxyScale
// ---------------------------------------------------------------------------

/// Decode-time downscale factor recorded on a buffer for provenance.
///
/// Recording a level never resamples the buffer. Decoders size their proxy
/// buffers with [`scale_size`](Self::scale_size) and either read at reduced
/// resolution themselves or fill them with [`convert_proxy`](crate::convert_proxy).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ProxyScale {
    /// Full resolution.
    #[default]
    None,
    /// 1/2 resolution.
    Half,
    /// 1/4 resolution.
    Quarter,
    /// 1/8 resolution.
    Eighth,
}

impl ProxyScale {
    /// Downscale factor (1, 2, 4 or 8).
    #[inline]
    pub const fn factor(self) -> u32 {
        match self {
            Self::None => 1,
            Self::Half => 2,
            Self::Quarter => 4,
            Self::Eighth => 8,
        }
    }

    /// Proxy level for a factor, `None` unless it is 1, 2, 4 or 8.
    pub const fn from_factor(factor: u32) -> Option<Self> {
        match factor {
            1 => Some(Self::None),
            2 => Some(Self::Half),
            4 => Some(Self::Quarter),
            8 => Some(Self::Eighth),
            _ => None,
        }
    }

    /// Proxy dimensions for a full-size image, rounding up so no source
    /// column or row is dropped.
    #[inline]
    pub const fn scale_size(self, width: u32, height: u32) -> (u32, u32) {
        let f = self.factor();
        (width.div_ceil(f), height.div_ceil(f))
    }
}

/// Axes along which stored pixels are mirrored relative to display
/// orientation. Bottom-up Targa and SGI files decode with `y` set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Mirror {
    /// Columns are stored right to left.
    pub x: bool,
    /// Rows are stored bottom to top.
    pub y: bool,
}

impl Mirror {
    /// Not mirrored.
    pub const NONE: Self = Self { x: false, y: false };
    /// Rows stored bottom to top.
    pub const VERTICAL: Self = Self { x: false, y: true };
}

// ---------------------------------------------------------------------------
// PixelBuffer
// ---------------------------------------------------------------------------

/// Owned, tightly packed pixel buffer with format metadata.
///
/// The byte length always equals `height * width * bytes_per_pixel` for the
/// current spec.
#[derive(Clone, PartialEq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    spec: PixelSpec,
    info: FormatInfo,
    proxy: ProxyScale,
    mirror: Mirror,
}

impl Default for PixelBuffer {
    /// A 0x0 `L U8` buffer.
    fn default() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            spec: PixelSpec::L_U8,
            info: FormatInfo::table(1, SampleType::U8),
            proxy: ProxyScale::None,
            mirror: Mirror::NONE,
        }
    }
}

impl PixelBuffer {
    /// Allocate a zero-filled buffer.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] for an illegal spec, [`Error::AllocationFailed`]
    /// if the byte size overflows or the allocator refuses it.
    pub fn new(width: u32, height: u32, spec: PixelSpec) -> Result<Self> {
        let info = descriptor_for(spec)?;
        let len = byte_len(width, height, spec, &info)?;
        let data = alloc_zeroed(len, width, height, spec)?;
        tracing::debug!(width, height, %spec, bytes = len, "allocated pixel buffer");
        Ok(Self {
            data,
            width,
            height,
            spec,
            info,
            proxy: ProxyScale::None,
            mirror: Mirror::NONE,
        })
    }

    /// Wrap decoded bytes without copying.
    ///
    /// # Errors
    ///
    /// [`Error::LengthMismatch`] unless `data.len()` is exactly the packed size.
    pub fn from_vec(data: Vec<u8>, width: u32, height: u32, spec: PixelSpec) -> Result<Self> {
        let info = descriptor_for(spec)?;
        let expected = byte_len(width, height, spec, &info)?;
        if data.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            spec,
            info,
            proxy: ProxyScale::None,
            mirror: Mirror::NONE,
        })
    }

    /// Give up the backing bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Change dimensions and/or spec.
    ///
    /// When the byte size changes the storage is replaced with a fresh
    /// zero-filled allocation; contents are never reflowed. When the size is
    /// unchanged the existing bytes are kept as-is (reinterpreted under the
    /// new spec). On error the buffer is left untouched.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn resize(&mut self, width: u32, height: u32, spec: PixelSpec) -> Result<()> {
        let info = descriptor_for(spec)?;
        let len = byte_len(width, height, spec, &info)?;
        if len != self.data.len() {
            self.data = alloc_zeroed(len, width, height, spec)?;
            tracing::debug!(width, height, %spec, bytes = len, "reallocated pixel buffer");
        }
        self.width = width;
        self.height = height;
        self.spec = spec;
        self.info = info;
        Ok(())
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel spec.
    #[inline]
    pub fn spec(&self) -> PixelSpec {
        self.spec
    }

    /// Byte-layout facts for the current spec.
    #[inline]
    pub fn info(&self) -> FormatInfo {
        self.info
    }

    /// Recorded proxy level.
    #[inline]
    pub fn proxy(&self) -> ProxyScale {
        self.proxy
    }

    /// Record the proxy level this buffer was decoded at.
    #[inline]
    pub fn set_proxy(&mut self, proxy: ProxyScale) {
        self.proxy = proxy;
    }

    /// Builder form of [`set_proxy`](Self::set_proxy).
    #[inline]
    pub fn with_proxy(mut self, proxy: ProxyScale) -> Self {
        self.proxy = proxy;
        self
    }

    /// Recorded mirroring of the stored pixels.
    #[inline]
    pub fn mirror(&self) -> Mirror {
        self.mirror
    }

    /// Record how the stored pixels are mirrored.
    #[inline]
    pub fn set_mirror(&mut self, mirror: Mirror) {
        self.mirror = mirror;
    }

    /// Builder form of [`set_mirror`](Self::set_mirror).
    #[inline]
    pub fn with_mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = mirror;
        self
    }

    /// Bytes per scanline (no padding).
    #[inline]
    pub fn bytes_per_scanline(&self) -> usize {
        self.width as usize * self.info.bytes_per_pixel
    }

    /// Whether the buffer holds no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All pixel bytes, scanline after scanline.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to all pixel bytes.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Fill every byte with zero.
    pub fn zero(&mut self) {
        self.data.fill(0);
    }

    // Addressing --------------------------------------------------------------

    /// Bytes of scanline `y`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `y >= height`.
    pub fn scanline(&self, y: u32) -> Result<&[u8]> {
        let range = self.scanline_range(y)?;
        Ok(&self.data[range])
    }

    /// Mutable bytes of scanline `y`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if `y >= height`.
    pub fn scanline_mut(&mut self, y: u32) -> Result<&mut [u8]> {
        let range = self.scanline_range(y)?;
        Ok(&mut self.data[range])
    }

    /// Bytes of the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if the address is outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Result<&[u8]> {
        let range = self.pixel_range(x, y)?;
        Ok(&self.data[range])
    }

    /// Mutable bytes of the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if the address is outside the buffer.
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Result<&mut [u8]> {
        let range = self.pixel_range(x, y)?;
        Ok(&mut self.data[range])
    }

    /// Iterate over scanlines top to bottom.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
        let bps = self.bytes_per_scanline();
        (0..self.height as usize).map(move |y| &self.data[y * bps..(y + 1) * bps])
    }

    fn out_of_range(&self, x: u32, y: u32) -> Error {
        Error::OutOfRange {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }

    fn scanline_range(&self, y: u32) -> Result<core::ops::Range<usize>> {
        if y >= self.height {
            return Err(self.out_of_range(0, y));
        }
        let bps = self.bytes_per_scanline();
        let start = y as usize * bps;
        Ok(start..start + bps)
    }

    fn pixel_range(&self, x: u32, y: u32) -> Result<core::ops::Range<usize>> {
        if x >= self.width || y >= self.height {
            return Err(self.out_of_range(x, y));
        }
        let bpp = self.info.bytes_per_pixel;
        let start = y as usize * self.bytes_per_scanline() + x as usize * bpp;
        Ok(start..start + bpp)
    }

    // Utilities ---------------------------------------------------------------

    /// Reverse the byte order of every component in place.
    ///
    /// Packed `RGB U10` pixels are swapped as whole 32-bit words. 8-bit
    /// buffers are left alone.
    pub fn swap_endian(&mut self) {
        let unit = if self.info.is_packed {
            4
        } else {
            self.info.bytes_per_component
        };
        if unit < 2 {
            return;
        }
        for component in self.data.chunks_exact_mut(unit) {
            component.reverse();
        }
    }

    /// Reverse the scanline order in place and toggle [`Mirror::y`].
    pub fn flip_rows(&mut self) {
        let bps = self.bytes_per_scanline();
        let rows = self.height as usize;
        for y in 0..rows / 2 {
            let (top, bottom) = self.data.split_at_mut((rows - 1 - y) * bps);
            top[y * bps..(y + 1) * bps].swap_with_slice(&mut bottom[..bps]);
        }
        self.mirror.y = !self.mirror.y;
    }

    /// Reverse the pixel order of every scanline in place and toggle
    /// [`Mirror::x`].
    pub fn flip_columns(&mut self) {
        let (bps, bpp) = (self.bytes_per_scanline(), self.info.bytes_per_pixel);
        if bps > 0 {
            for row in self.data.chunks_exact_mut(bps) {
                // reversing whole bytes then each pixel keeps component order
                row.reverse();
                for px in row.chunks_exact_mut(bpp) {
                    px.reverse();
                }
            }
        }
        self.mirror.x = !self.mirror.x;
    }

    /// Horizontal `L F32` ramp from 0.0 at the left edge to 1.0 at the right.
    ///
    /// A `width x 1` gradient is an identity lookup table.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn gradient(width: u32, height: u32) -> Result<Self> {
        let mut buf = Self::new(width, height, PixelSpec::L_F32)?;
        let denom = width.saturating_sub(1).max(1) as f32;
        let bps = buf.bytes_per_scanline();
        if bps == 0 {
            return Ok(buf);
        }
        for row in buf.data.chunks_exact_mut(bps) {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                px.copy_from_slice(&(x as f32 / denom).to_ne_bytes());
            }
        }
        Ok(buf)
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PixelBuffer({}x{}, {}", self.width, self.height, self.spec)?;
        if self.proxy != ProxyScale::None {
            write!(f, ", proxy 1/{}", self.proxy.factor())?;
        }
        if self.mirror.x {
            f.write_str(", mirror x")?;
        }
        if self.mirror.y {
            f.write_str(", mirror y")?;
        }
        f.write_str(")")
    }
}

fn byte_len(width: u32, height: u32, spec: PixelSpec, info: &FormatInfo) -> Result<usize> {
    info.bytes_per_scanline(width)
        .and_then(|bps| bps.checked_mul(height as usize))
        .filter(|&len| len <= isize::MAX as usize)
        .ok_or(Error::AllocationFailed {
            width,
            height,
            spec,
        })
}

pub(crate) fn alloc_zeroed(
    len: usize,
    width: u32,
    height: u32,
    spec: PixelSpec,
) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| Error::AllocationFailed {
            width,
            height,
            spec,
        })?;
    data.resize(len, 0);
    Ok(data)
}

// ---------------------------------------------------------------------------
// Planar storage
// ---------------------------------------------------------------------------

fn planar_params(buf: &PixelBuffer, planar_len: usize) -> Result<(usize, usize, usize)> {
    if buf.info.is_packed {
        return Err(Error::UnsupportedFormat {
            layout: buf.spec.layout,
            sample: buf.spec.sample,
        });
    }
    if planar_len != buf.data.len() {
        return Err(Error::LengthMismatch {
            expected: buf.data.len(),
            actual: planar_len,
        });
    }
    let pixels = buf.width as usize * buf.height as usize;
    Ok((pixels, buf.info.channel_count, buf.info.bytes_per_component))
}

/// Fill `dst` from channel-planar bytes (plane `c` starts at
/// `c * width * height * bytes_per_component`).
///
/// # Errors
///
/// [`Error::UnsupportedFormat`] for packed `RGB U10`, [`Error::LengthMismatch`]
/// if `planar` is not exactly the size of `dst`.
pub fn interleave_planes(planar: &[u8], dst: &mut PixelBuffer) -> Result<()> {
    let (pixels, channels, bpc) = planar_params(dst, planar.len())?;
    let plane = pixels * bpc;
    for (i, px) in dst.data.chunks_exact_mut(channels * bpc).enumerate() {
        for (c, component) in px.chunks_exact_mut(bpc).enumerate() {
            let at = c * plane + i * bpc;
            component.copy_from_slice(&planar[at..at + bpc]);
        }
    }
    Ok(())
}

/// Split `src` into channel-planar bytes, the inverse of [`interleave_planes`].
///
/// # Errors
///
/// Same as [`interleave_planes`].
pub fn deinterleave_planes(src: &PixelBuffer, planar: &mut [u8]) -> Result<()> {
    let (pixels, channels, bpc) = planar_params(src, planar.len())?;
    let plane = pixels * bpc;
    for (i, px) in src.data.chunks_exact(channels * bpc).enumerate() {
        for (c, component) in px.chunks_exact(bpc).enumerate() {
            let at = c * plane + i * bpc;
            planar[at..at + bpc].copy_from_slice(component);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// imgref interop
// ---------------------------------------------------------------------------

macro_rules! impl_try_from_imgref {
    ($pixel:ty, $spec:expr, $($c:ident),+) => {
        impl TryFrom<ImgRef<'_, $pixel>> for PixelBuffer {
            type Error = Error;

            /// Copy an `imgref` image into a packed buffer.
            fn try_from(img: ImgRef<'_, $pixel>) -> Result<Self> {
                let too_big = || Error::AllocationFailed {
                    width: u32::MAX,
                    height: u32::MAX,
                    spec: $spec,
                };
                let width = u32::try_from(img.width()).map_err(|_| too_big())?;
                let height = u32::try_from(img.height()).map_err(|_| too_big())?;
                let mut buf = PixelBuffer::new(width, height, $spec)?;
                let bpc = buf.info.bytes_per_component;
                let mut out = buf.data.chunks_exact_mut(buf.info.bytes_per_pixel);
                for row in img.rows() {
                    for (px, dst) in row.iter().zip(&mut out) {
                        let mut components = dst.chunks_exact_mut(bpc);
                        $(
                            if let Some(c) = components.next() {
                                c.copy_from_slice(&px.$c.to_ne_bytes());
                            }
                        )+
                    }
                }
                Ok(buf)
            }
        }
    };
}

impl_try_from_imgref!(Rgb<u8>, PixelSpec::RGB_U8, r, g, b);
impl_try_from_imgref!(Rgba<u8>, PixelSpec::RGBA_U8, r, g, b, a);
impl_try_from_imgref!(Rgb<u16>, PixelSpec::RGB_U16, r, g, b);
impl_try_from_imgref!(Rgba<u16>, PixelSpec::RGBA_U16, r, g, b, a);
impl_try_from_imgref!(Rgb<f32>, PixelSpec::RGB_F32, r, g, b);
impl_try_from_imgref!(Rgba<f32>, PixelSpec::RGBA_F32, r, g, b, a);

impl PixelBuffer {
    /// Borrow as RGB8 if that's the stored spec and the buffer is non-empty.
    pub fn as_rgb8(&self) -> Option<ImgRef<'_, Rgb<u8>>> {
        (self.spec == PixelSpec::RGB_U8 && !self.is_empty()).then(|| {
            imgref::Img::new(
                self.data.as_rgb(),
                self.width as usize,
                self.height as usize,
            )
        })
    }

    /// Borrow as RGBA8 if that's the stored spec and the buffer is non-empty.
    pub fn as_rgba8(&self) -> Option<ImgRef<'_, Rgba<u8>>> {
        (self.spec == PixelSpec::RGBA_U8 && !self.is_empty()).then(|| {
            imgref::Img::new(
                self.data.as_rgba(),
                self.width as usize,
                self.height as usize,
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ChannelLayout;

    // --- allocation ---

    #[test]
    fn new_is_zeroed_and_sized() {
        let buf = PixelBuffer::new(10, 5, PixelSpec::RGB_U8).unwrap();
        assert_eq!(buf.width(), 10);
        assert_eq!(buf.height(), 5);
        assert_eq!(buf.bytes_per_scanline(), 30);
        assert_eq!(buf.as_bytes().len(), 150);
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn packed_u10_is_four_bytes_per_pixel() {
        let buf = PixelBuffer::new(3, 2, PixelSpec::RGB_U10).unwrap();
        assert_eq!(buf.as_bytes().len(), 24);
    }

    #[test]
    fn new_rejects_illegal_spec() {
        let spec = PixelSpec::new(ChannelLayout::La, SampleType::U10);
        assert!(matches!(
            PixelBuffer::new(1, 1, spec),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn new_reports_overflow_as_allocation_failure() {
        let err = PixelBuffer::new(u32::MAX, u32::MAX, PixelSpec::RGBA_F32).unwrap_err();
        assert_eq!(
            err,
            Error::AllocationFailed {
                width: u32::MAX,
                height: u32::MAX,
                spec: PixelSpec::RGBA_F32
            }
        );
    }

    #[test]
    fn refused_allocation_is_an_error() {
        assert_eq!(
            alloc_zeroed(usize::MAX, 7, 1, PixelSpec::L_U8),
            Err(Error::AllocationFailed {
                width: 7,
                height: 1,
                spec: PixelSpec::L_U8
            })
        );
    }

    #[test]
    fn default_is_empty() {
        let buf = PixelBuffer::default();
        assert!(buf.is_empty());
        assert_eq!(buf.rows().len(), 0);
    }

    #[test]
    fn from_vec_requires_exact_length() {
        assert!(PixelBuffer::from_vec(vec![0; 12], 2, 2, PixelSpec::RGB_U8).is_ok());
        assert_eq!(
            PixelBuffer::from_vec(vec![0; 13], 2, 2, PixelSpec::RGB_U8).unwrap_err(),
            Error::LengthMismatch {
                expected: 12,
                actual: 13
            }
        );
    }

    #[test]
    fn into_vec_rewraps() {
        let buf = PixelBuffer::new(4, 4, PixelSpec::RGBA_U8).unwrap();
        let v = buf.into_vec();
        let buf2 = PixelBuffer::from_vec(v, 4, 4, PixelSpec::RGBA_U8).unwrap();
        assert_eq!(buf2.width(), 4);
    }

    // --- resize ---

    #[test]
    fn resize_to_new_size_discards_contents() {
        let mut buf = PixelBuffer::from_vec(vec![7; 4], 2, 2, PixelSpec::L_U8).unwrap();
        buf.resize(3, 3, PixelSpec::L_U8).unwrap();
        assert_eq!(buf.as_bytes(), &[0; 9]);
        assert_eq!(buf.width(), 3);
    }

    #[test]
    fn resize_with_same_byte_size_keeps_storage() {
        let mut buf = PixelBuffer::from_vec(vec![7; 4], 2, 2, PixelSpec::L_U8).unwrap();
        buf.resize(1, 2, PixelSpec::L_U16).unwrap();
        assert_eq!(buf.spec(), PixelSpec::L_U16);
        assert_eq!(buf.as_bytes(), &[7; 4]);
    }

    #[test]
    fn failed_resize_leaves_buffer_alone() {
        let mut buf = PixelBuffer::new(2, 2, PixelSpec::L_U8).unwrap();
        let bad = PixelSpec::new(ChannelLayout::L, SampleType::U10);
        assert!(buf.resize(4, 4, bad).is_err());
        assert_eq!(buf.width(), 2);
        assert_eq!(buf.spec(), PixelSpec::L_U8);
    }

    // --- addressing ---

    #[test]
    fn scanline_and_pixel_addressing() {
        let data: Vec<u8> = (0..12).collect();
        let buf = PixelBuffer::from_vec(data, 2, 2, PixelSpec::RGB_U8).unwrap();
        assert_eq!(buf.scanline(1).unwrap(), &[6, 7, 8, 9, 10, 11]);
        assert_eq!(buf.pixel(1, 0).unwrap(), &[3, 4, 5]);
        let rows: Vec<&[u8]> = buf.rows().collect();
        assert_eq!(rows[0], &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn addressing_past_bounds_is_an_error() {
        let mut buf = PixelBuffer::new(2, 2, PixelSpec::RGB_U8).unwrap();
        assert_eq!(
            buf.scanline(2).unwrap_err(),
            Error::OutOfRange {
                x: 0,
                y: 2,
                width: 2,
                height: 2
            }
        );
        assert!(buf.pixel(2, 0).is_err());
        assert!(buf.pixel_mut(0, 5).is_err());
    }

    #[test]
    fn pixel_mut_writes_through() {
        let mut buf = PixelBuffer::new(2, 1, PixelSpec::LA_U8).unwrap();
        buf.pixel_mut(1, 0).unwrap().copy_from_slice(&[9, 8]);
        assert_eq!(buf.as_bytes(), &[0, 0, 9, 8]);
        buf.zero();
        assert_eq!(buf.as_bytes(), &[0; 4]);
    }

    // --- proxy ---

    #[test]
    fn proxy_scale_sizes_round_up() {
        assert_eq!(ProxyScale::Quarter.scale_size(1920, 1081), (480, 271));
        assert_eq!(ProxyScale::None.scale_size(7, 3), (7, 3));
        assert_eq!(ProxyScale::from_factor(8), Some(ProxyScale::Eighth));
        assert_eq!(ProxyScale::from_factor(3), None);
    }

    #[test]
    fn proxy_is_recorded() {
        let buf = PixelBuffer::new(1, 1, PixelSpec::L_U8)
            .unwrap()
            .with_proxy(ProxyScale::Half);
        assert_eq!(buf.proxy(), ProxyScale::Half);
        assert_eq!(format!("{buf:?}"), "PixelBuffer(1x1, L U8, proxy 1/2)");
    }

    // --- utilities ---

    #[test]
    fn swap_endian_per_component() {
        let mut buf = PixelBuffer::from_vec(vec![1, 2, 3, 4], 2, 1, PixelSpec::L_U16).unwrap();
        buf.swap_endian();
        assert_eq!(buf.as_bytes(), &[2, 1, 4, 3]);

        let mut packed = PixelBuffer::from_vec(vec![1, 2, 3, 4], 1, 1, PixelSpec::RGB_U10).unwrap();
        packed.swap_endian();
        assert_eq!(packed.as_bytes(), &[4, 3, 2, 1]);

        let mut bytes = PixelBuffer::from_vec(vec![1, 2], 2, 1, PixelSpec::L_U8).unwrap();
        bytes.swap_endian();
        assert_eq!(bytes.as_bytes(), &[1, 2]);
    }

    #[test]
    fn gradient_ramps_zero_to_one() {
        let g = PixelBuffer::gradient(5, 2).unwrap();
        assert_eq!(g.spec(), PixelSpec::L_F32);
        let row1: Vec<f32> = g
            .scanline(1)
            .unwrap()
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(row1, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn single_column_gradient_is_zero() {
        let g = PixelBuffer::gradient(1, 1).unwrap();
        assert_eq!(g.as_bytes(), &0.0f32.to_ne_bytes());
    }

    // --- mirror ---

    #[test]
    fn flip_rows_reverses_scanlines() {
        let mut buf = PixelBuffer::from_vec((0..9).collect(), 3, 3, PixelSpec::L_U8)
            .unwrap()
            .with_mirror(Mirror::VERTICAL);
        buf.flip_rows();
        assert_eq!(buf.as_bytes(), &[6, 7, 8, 3, 4, 5, 0, 1, 2]);
        assert_eq!(buf.mirror(), Mirror::NONE);

        let mut even = PixelBuffer::from_vec(vec![1, 2, 3, 4], 1, 4, PixelSpec::L_U8).unwrap();
        even.flip_rows();
        assert_eq!(even.as_bytes(), &[4, 3, 2, 1]);
        assert!(even.mirror().y);
    }

    #[test]
    fn flip_columns_keeps_component_order() {
        let data: Vec<u8> = (0..12).collect();
        let mut buf = PixelBuffer::from_vec(data, 2, 1, PixelSpec::RGB_U16).unwrap();
        buf.flip_columns();
        assert_eq!(buf.as_bytes(), &[6, 7, 8, 9, 10, 11, 0, 1, 2, 3, 4, 5]);
        assert_eq!(buf.mirror(), Mirror { x: true, y: false });
        buf.flip_columns();
        assert_eq!(buf.as_bytes(), &(0..12).collect::<Vec<u8>>()[..]);
    }

    #[test]
    fn flips_of_empty_buffers_only_toggle() {
        let mut buf = PixelBuffer::default();
        buf.flip_rows();
        buf.flip_columns();
        assert_eq!(buf.mirror(), Mirror { x: true, y: true });
        assert_eq!(format!("{buf:?}"), "PixelBuffer(0x0, L U8, mirror x, mirror y)");
    }

    // --- planar ---

    #[test]
    fn planes_interleave_and_back() {
        let planar = [1u8, 2, 10, 20, 100, 200];
        let mut buf = PixelBuffer::new(2, 1, PixelSpec::RGB_U8).unwrap();
        interleave_planes(&planar, &mut buf).unwrap();
        assert_eq!(buf.as_bytes(), &[1, 10, 100, 2, 20, 200]);

        let mut back = [0u8; 6];
        deinterleave_planes(&buf, &mut back).unwrap();
        assert_eq!(back, planar);
    }

    #[test]
    fn planes_keep_multibyte_components_together() {
        let planar = [1u8, 2, 3, 4];
        let mut buf = PixelBuffer::new(1, 1, PixelSpec::LA_U16).unwrap();
        interleave_planes(&planar, &mut buf).unwrap();
        assert_eq!(buf.as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn planes_reject_packed_and_wrong_length() {
        let mut packed = PixelBuffer::new(1, 1, PixelSpec::RGB_U10).unwrap();
        assert!(matches!(
            interleave_planes(&[0; 4], &mut packed),
            Err(Error::UnsupportedFormat { .. })
        ));
        let mut buf = PixelBuffer::new(2, 1, PixelSpec::RGB_U8).unwrap();
        assert!(matches!(
            interleave_planes(&[0; 5], &mut buf),
            Err(Error::LengthMismatch { .. })
        ));
    }

    // --- imgref ---

    #[test]
    fn imgref_rgb8_round_trip() {
        let pixels = vec![Rgb { r: 1u8, g: 2, b: 3 }, Rgb { r: 4, g: 5, b: 6 }];
        let img = imgref::ImgVec::new(pixels, 2, 1);
        let buf = PixelBuffer::try_from(img.as_ref()).unwrap();
        assert_eq!(buf.spec(), PixelSpec::RGB_U8);
        assert_eq!(buf.as_bytes(), &[1, 2, 3, 4, 5, 6]);
        let view = buf.as_rgb8().unwrap();
        assert_eq!(view.buf()[1], Rgb { r: 4, g: 5, b: 6 });
        assert!(buf.as_rgba8().is_none());
    }

    #[test]
    fn imgref_rgba_f32_uses_native_bytes() {
        let pixels = vec![Rgba {
            r: 0.5f32,
            g: 1.0,
            b: 0.0,
            a: 1.0,
        }];
        let img = imgref::ImgVec::new(pixels, 1, 1);
        let buf = PixelBuffer::try_from(img.as_ref()).unwrap();
        assert_eq!(buf.spec(), PixelSpec::RGBA_F32);
        let expected: Vec<u8> = [0.5f32, 1.0, 0.0, 1.0]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        assert_eq!(buf.as_bytes(), expected.as_slice());
    }

    #[test]
    fn imgref_rgba8_keeps_every_component() {
        let pixels = vec![
            Rgba { r: 1u8, g: 2, b: 3, a: 4 },
            Rgba { r: 5, g: 6, b: 7, a: 8 },
        ];
        let img = imgref::ImgVec::new(pixels, 2, 1);
        let buf = PixelBuffer::try_from(img.as_ref()).unwrap();
        assert_eq!(buf.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn imgref_rgb16_keeps_component_order() {
        let pixels = vec![Rgb {
            r: 0x0102u16,
            g: 0x0304,
            b: 0x0506,
        }];
        let img = imgref::ImgVec::new(pixels, 1, 1);
        let buf = PixelBuffer::try_from(img.as_ref()).unwrap();
        let got: Vec<u16> = buf
            .as_bytes()
            .chunks_exact(2)
            .map(|c| u16::from_ne_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(got, vec![0x0102, 0x0304, 0x0506]);
    }

    #[test]
    fn imgref_with_stride_copies_only_visible_pixels() {
        let pixels: Vec<Rgb<u16>> = (0..6u16).map(|v| Rgb { r: v, g: v, b: v }).collect();
        let img = imgref::Img::new_stride(pixels.as_slice(), 2, 2, 3);
        let buf = PixelBuffer::try_from(img).unwrap();
        let r = |x, y| u16::from_ne_bytes(buf.pixel(x, y).unwrap()[..2].try_into().unwrap());
        assert_eq!(r(0, 1), 3);
        assert_eq!(r(1, 1), 4);
    }
}
