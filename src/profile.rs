//! Display color profiles.
//!
//! A [`ColorProfile`] is immutable data describing one tone transform. To run
//! it, [`ColorProfile::prepare`] validates the parameters and precomputes
//! constants into a [`Transform`], which is applied per scanline or per
//! buffer. [`apply`] does both in one call.
//!
//! Transforms read every color component as float, evaluate in `f64`, and
//! re-quantize with the same rules as the converter. Alpha is never touched.
//! Profiles do not chain: exposure followed by display gamma is two
//! [`apply`] calls.

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::convert::{ConvertOptions, convert_pixels, load_values, store_pixel};
use crate::error::{Error, Result};
use crate::format::{PixelSpec, descriptor_for};
use crate::sample::Value;

/// Added to the exposure stops so that 0 stops maps mid-gray to display
/// mid-gray.
pub const EXPOSURE_GAIN_OFFSET: f64 = 2.47393;

/// Knee widths at or below this are treated as no knee.
const KNEE_EPSILON: f64 = 1e-12;

/// Output level, in stops, that the top of a slider-defined knee maps to.
pub const KNEE_WHITE_STOPS: f64 = 3.5;

// ---------------------------------------------------------------------------
// Profile data
// ---------------------------------------------------------------------------

/// Photographic exposure parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exposure {
    /// Exposure adjustment in stops.
    pub stops: f64,
    /// Black level subtracted before the gain.
    pub defog: f64,
    /// Highlight compression starts above this (post-gain) value.
    pub knee_low: f64,
    /// Upper knee parameter; `knee_high - knee_low` sets the roll-off strength.
    pub knee_high: f64,
}

impl Exposure {
    /// Exposure with the given parameters.
    pub const fn new(stops: f64, defog: f64, knee_low: f64, knee_high: f64) -> Self {
        Self {
            stops,
            defog,
            knee_low,
            knee_high,
        }
    }

    /// Linear gain, `2^(stops + 2.47393)`.
    #[inline]
    pub fn gain(&self) -> f64 {
        2f64.powf(self.stops + EXPOSURE_GAIN_OFFSET)
    }

    /// Evaluate the exposure curve for one linear value.
    pub fn eval(&self, value: f64) -> f64 {
        exposure(value, self.defog, self.gain(), self.knee_low, self.knee())
    }

    /// Exposure from viewer slider values, with both knee ends in stops.
    ///
    /// The knee starts at `2^knee_low_stops`; its strength is solved so an
    /// input of `2^knee_high_stops` comes out at `2^KNEE_WHITE_STOPS`. A
    /// knee that needs no compression comes out with no roll-off.
    pub fn from_knee_stops(
        stops: f64,
        defog: f64,
        knee_low_stops: f64,
        knee_high_stops: f64,
    ) -> Self {
        let k = 2f64.powf(knee_low_stops);
        let white = 2f64.powf(KNEE_WHITE_STOPS);
        let f = solve_knee(2f64.powf(knee_high_stops) - k, white - k);
        Self::new(stops, defog, k, k + f)
    }

    fn knee(&self) -> Option<f64> {
        let f = self.knee_high - self.knee_low;
        (f > KNEE_EPSILON).then_some(f)
    }

    fn validate(&self) -> Result<()> {
        let all_finite = [self.stops, self.defog, self.knee_low, self.knee_high]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(Error::InvalidProfile("exposure parameters must be finite"));
        }
        Ok(())
    }
}

#[inline]
fn knee_curve(x: f64, f: f64) -> f64 {
    (x * f + 1.0).ln() / f
}

/// Roll-off strength `f` with `knee_curve(x, f) == y`, by bisection.
///
/// 0 when `x` or `y` is not positive.
fn solve_knee(x: f64, y: f64) -> f64 {
    if !(x > 0.0 && y > 0.0 && x.is_finite() && y.is_finite()) {
        return 0.0;
    }
    let (mut f0, mut f1) = (0.0, 1.0);
    // the curve falls toward 0 as f grows, so this ends
    while knee_curve(x, f1) > y {
        f0 = f1;
        f1 *= 2.0;
    }
    for _ in 0..30 {
        let mid = (f0 + f1) / 2.0;
        if knee_curve(x, mid) < y {
            f1 = mid;
        } else {
            f0 = mid;
        }
    }
    (f0 + f1) / 2.0
}

#[inline]
fn exposure(value: f64, defog: f64, gain: f64, knee_low: f64, knee: Option<f64>) -> f64 {
    let c = (value - defog).max(0.0) * gain;
    match knee {
        Some(f) if c > knee_low => knee_low + ((c - knee_low) * f + 1.0).ln() / f,
        _ => c,
    }
}

/// Tone transform applied to color channels.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ColorProfile {
    /// Identity; the buffer is left byte-for-byte unchanged.
    #[default]
    Raw,
    /// `out = max(in, 0)^(1 / value)`.
    Gamma {
        /// Display gamma, typically 2.2.
        value: f64,
    },
    /// 1-D lookup table with linear interpolation.
    ///
    /// Only the first scanline of `table` is used. Inputs are clamped to
    /// `[0, 1]` and mapped onto the table's first to last entry. Tables with
    /// RGB(A) layout map each color channel through its own column; `L(A)`
    /// tables map every channel through column 0.
    Lut {
        /// Decoded table.
        table: PixelBuffer,
    },
    /// Photographic exposure with defog and highlight knee.
    Exposure(Exposure),
}

impl ColorProfile {
    /// Gamma profile.
    pub const fn gamma(value: f64) -> Self {
        Self::Gamma { value }
    }

    /// Whether this is the identity profile.
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw)
    }

    /// Validate parameters and precompute evaluation constants.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidProfile`] for a non-positive or non-finite gamma, an
    /// empty table, or non-finite exposure parameters.
    pub fn prepare(&self) -> Result<Transform> {
        let op = match self {
            Self::Raw => Op::Identity,
            Self::Gamma { value } => {
                if !(value.is_finite() && *value > 0.0) {
                    return Err(Error::InvalidProfile("gamma must be positive and finite"));
                }
                Op::Gamma { inv: 1.0 / value }
            }
            Self::Lut { table } => Op::Lut(Lut::from_table(table)?),
            Self::Exposure(e) => {
                e.validate()?;
                Op::Exposure {
                    defog: e.defog,
                    gain: e.gain(),
                    knee_low: e.knee_low,
                    knee: e.knee(),
                }
            }
        };
        Ok(Transform { op })
    }
}

// ---------------------------------------------------------------------------
// Prepared transforms
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Lut {
    /// One column per mapped channel, each with the same length.
    columns: Vec<Vec<f32>>,
}

impl Lut {
    fn from_table(table: &PixelBuffer) -> Result<Self> {
        if table.is_empty() {
            return Err(Error::InvalidProfile("lookup table is empty"));
        }
        let width = table.width() as usize;
        let spec = table.spec();
        let float = if spec.layout.color_channels() == 3 {
            PixelSpec::RGB_F32
        } else {
            PixelSpec::L_F32
        };
        let float_info = descriptor_for(float)?;
        let mut row = vec![0u8; width * float_info.bytes_per_pixel];
        convert_pixels(
            table.scanline(0)?,
            spec,
            &table.info(),
            &mut row,
            float,
            &float_info,
            &ConvertOptions::default(),
        );
        let channels = float.channel_count();
        let columns = (0..channels)
            .map(|c| {
                row.chunks_exact(float_info.bytes_per_pixel)
                    .map(|px| {
                        let at = c * 4;
                        f32::from_ne_bytes([px[at], px[at + 1], px[at + 2], px[at + 3]])
                    })
                    .collect()
            })
            .collect();
        Ok(Self { columns })
    }

    fn eval(&self, channel: usize, value: f64) -> f64 {
        let column = &self.columns[channel.min(self.columns.len() - 1)];
        let last = column.len() - 1;
        // NaN compares false and lands at index 0
        let x = (if value > 0.0 { value.min(1.0) } else { 0.0 }) * last as f64;
        let i = (x.floor() as usize).min(last);
        let frac = x - i as f64;
        let lo = f64::from(column[i]);
        if i == last {
            return lo;
        }
        let hi = f64::from(column[i + 1]);
        lo + (hi - lo) * frac
    }
}

#[derive(Clone, Debug)]
enum Op {
    Identity,
    Gamma {
        inv: f64,
    },
    Lut(Lut),
    Exposure {
        defog: f64,
        gain: f64,
        knee_low: f64,
        knee: Option<f64>,
    },
}

/// A validated profile ready to run over pixels.
#[derive(Clone, Debug)]
pub struct Transform {
    op: Op,
}

impl Transform {
    /// Whether applying this transform leaves pixels unchanged.
    pub fn is_identity(&self) -> bool {
        matches!(self.op, Op::Identity)
    }

    /// Transform one normalized value of color channel `channel` (0 = red or
    /// luminance).
    pub fn eval(&self, channel: usize, value: f64) -> f64 {
        match &self.op {
            Op::Identity => value,
            Op::Gamma { inv } => value.max(0.0).powf(*inv),
            Op::Lut(lut) => lut.eval(channel, value),
            Op::Exposure {
                defog,
                gain,
                knee_low,
                knee,
            } => exposure(value, *defog, *gain, *knee_low, *knee),
        }
    }

    /// Transform a packed run of `spec` pixels in place.
    ///
    /// Callers that need to cancel long jobs apply scanline by scanline and
    /// check between calls.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] for an illegal spec, [`Error::LengthMismatch`]
    /// if `pixels` is not a whole number of pixels.
    pub fn apply_scanline(&self, pixels: &mut [u8], spec: PixelSpec) -> Result<()> {
        let info = descriptor_for(spec)?;
        if self.is_identity() {
            return Ok(());
        }
        let bpp = info.bytes_per_pixel;
        if pixels.len() % bpp != 0 {
            return Err(Error::LengthMismatch {
                expected: pixels.len() - pixels.len() % bpp,
                actual: pixels.len(),
            });
        }
        let colors = spec.layout.color_channels();
        for px in pixels.chunks_exact_mut(bpp) {
            let mut values = load_values(px, spec, &info);
            for (c, v) in values[..colors].iter_mut().enumerate() {
                *v = Value::Float(self.eval(c, f64::from(v.to_f32())) as f32);
            }
            store_pixel(&values, spec, &info, px);
        }
        Ok(())
    }

    /// Transform every pixel of `buffer` in place.
    ///
    /// # Errors
    ///
    /// As [`apply_scanline`](Self::apply_scanline); cannot fail for a
    /// buffer's own spec and length.
    pub fn apply_buffer(&self, buffer: &mut PixelBuffer) -> Result<()> {
        let spec = buffer.spec();
        self.apply_scanline(buffer.as_bytes_mut(), spec)
    }
}

/// Prepare `profile` and apply it to `buffer` in place.
///
/// # Errors
///
/// As [`ColorProfile::prepare`].
pub fn apply(profile: &ColorProfile, buffer: &mut PixelBuffer) -> Result<()> {
    if profile.is_raw() {
        return Ok(());
    }
    let transform = profile.prepare()?;
    tracing::debug!(
        width = buffer.width(),
        height = buffer.height(),
        spec = %buffer.spec(),
        profile = transform.op_name(),
        "applying color profile"
    );
    transform.apply_buffer(buffer)
}

impl Transform {
    fn op_name(&self) -> &'static str {
        match self.op {
            Op::Identity => "raw",
            Op::Gamma { .. } => "gamma",
            Op::Lut(_) => "lut",
            Op::Exposure { .. } => "exposure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_buffer(spec: PixelSpec, width: u32, values: &[f32]) -> PixelBuffer {
        let bytes = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        PixelBuffer::from_vec(bytes, width, 1, spec).unwrap()
    }

    fn f32s(buf: &PixelBuffer) -> Vec<f32> {
        buf.as_bytes()
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-5
    }

    // --- raw ---

    #[test]
    fn raw_leaves_bytes_untouched() {
        let bytes: Vec<u8> = (0..48u32).map(|i| (i * 37 % 256) as u8).collect();
        for spec in [PixelSpec::RGBA_U8, PixelSpec::RGB_F16, PixelSpec::RGB_U10] {
            let len = 4 * descriptor_for(spec).unwrap().bytes_per_pixel;
            let mut buf = PixelBuffer::from_vec(bytes[..len].to_vec(), 4, 1, spec).unwrap();
            let before = buf.clone();
            apply(&ColorProfile::Raw, &mut buf).unwrap();
            assert_eq!(buf, before);
        }
    }

    // --- gamma ---

    #[test]
    fn gamma_of_half() {
        let mut buf = f32_buffer(PixelSpec::L_F32, 1, &[0.5]);
        apply(&ColorProfile::gamma(2.2), &mut buf).unwrap();
        let out = f32s(&buf)[0];
        assert!((out - 0.7297).abs() < 1e-4, "{out}");
        assert!(close(f64::from(out), 0.5f64.powf(1.0 / 2.2)));
    }

    #[test]
    fn gamma_clamps_negative_and_keeps_alpha() {
        let mut buf = f32_buffer(PixelSpec::LA_F32, 1, &[-0.25, 0.5]);
        apply(&ColorProfile::gamma(2.2), &mut buf).unwrap();
        assert_eq!(f32s(&buf), vec![0.0, 0.5]);
    }

    #[test]
    fn gamma_requantizes_integers() {
        let mut buf = PixelBuffer::from_vec(vec![64, 128, 255, 77], 1, 1, PixelSpec::RGBA_U8).unwrap();
        apply(&ColorProfile::gamma(2.2), &mut buf).unwrap();
        let expect = |v: f64| ((v / 255.0).powf(1.0 / 2.2) * 255.0).round() as u8;
        assert_eq!(buf.as_bytes(), &[expect(64.0), expect(128.0), 255, 77]);
    }

    #[test]
    fn gamma_must_be_positive_and_finite() {
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                ColorProfile::gamma(value).prepare(),
                Err(Error::InvalidProfile(_))
            ));
        }
    }

    // --- lut ---

    #[test]
    fn gradient_lut_is_identity() {
        let lut = ColorProfile::Lut {
            table: PixelBuffer::gradient(256, 1).unwrap(),
        };
        let mut buf = PixelBuffer::from_vec((0..=255).collect(), 256, 1, PixelSpec::L_U8).unwrap();
        let before = buf.clone();
        apply(&lut, &mut buf).unwrap();
        assert_eq!(buf, before);
    }

    #[test]
    fn lut_interpolates_and_clamps() {
        let table = f32_buffer(PixelSpec::L_F32, 3, &[1.0, 0.5, 0.0]);
        let t = ColorProfile::Lut { table }.prepare().unwrap();
        assert!(close(t.eval(0, 0.0), 1.0));
        assert!(close(t.eval(0, 0.25), 0.75));
        assert!(close(t.eval(0, 0.5), 0.5));
        assert!(close(t.eval(0, 1.0), 0.0));
        assert!(close(t.eval(0, -3.0), 1.0));
        assert!(close(t.eval(0, 7.0), 0.0));
        assert!(close(t.eval(0, f64::NAN), 1.0));
    }

    #[test]
    fn rgb_lut_maps_each_channel_through_its_column() {
        // red inverted, green halved, blue identity
        let table = f32_buffer(PixelSpec::RGB_F32, 2, &[1.0, 0.0, 0.0, 0.0, 0.5, 1.0]);
        let mut buf = f32_buffer(PixelSpec::RGBA_F32, 1, &[1.0, 1.0, 0.25, 0.75]);
        apply(&ColorProfile::Lut { table }, &mut buf).unwrap();
        assert_eq!(f32s(&buf), vec![0.0, 0.5, 0.25, 0.75]);
    }

    #[test]
    fn luminance_lut_applies_to_every_channel() {
        let table = PixelBuffer::from_vec(vec![255, 0], 2, 1, PixelSpec::L_U8).unwrap();
        let mut buf = PixelBuffer::from_vec(vec![0, 255, 0], 1, 1, PixelSpec::RGB_U8).unwrap();
        apply(&ColorProfile::Lut { table }, &mut buf).unwrap();
        assert_eq!(buf.as_bytes(), &[255, 0, 255]);
    }

    #[test]
    fn single_entry_lut_is_constant() {
        let table = f32_buffer(PixelSpec::L_F32, 1, &[0.3]);
        let t = ColorProfile::Lut { table }.prepare().unwrap();
        assert!(close(t.eval(0, 0.9), 0.3f32 as f64));
    }

    #[test]
    fn empty_lut_is_rejected() {
        let lut = ColorProfile::Lut {
            table: PixelBuffer::default(),
        };
        assert_eq!(
            lut.prepare().unwrap_err(),
            Error::InvalidProfile("lookup table is empty")
        );
    }

    // --- exposure ---

    #[test]
    fn gain_constant_is_applied_exactly() {
        assert_eq!(Exposure::default().gain(), 2f64.powf(2.47393));
        assert!(close(Exposure::new(1.0, 0.0, 0.0, 0.0).gain(), 2f64.powf(3.47393)));
    }

    #[test]
    fn exposure_reduces_to_identity_at_unity_gain() {
        let e = Exposure::new(-EXPOSURE_GAIN_OFFSET, 0.0, 0.5, 0.5);
        for v in [0.0, 0.18, 0.5, 1.0, 4.0] {
            assert!(close(e.eval(v), v), "{v}");
        }
    }

    #[test]
    fn defog_subtracts_before_gain() {
        let e = Exposure::new(-EXPOSURE_GAIN_OFFSET + 1.0, 0.1, 0.0, 0.0);
        assert!(close(e.eval(0.6), 1.0));
        assert_eq!(e.eval(0.05), 0.0);
    }

    #[test]
    fn knee_compresses_highlights() {
        let e = Exposure::new(-EXPOSURE_GAIN_OFFSET, 0.0, 1.0, 2.0);
        assert!(close(e.eval(0.5), 0.5));
        assert!(close(e.eval(3.0), 1.0 + 3f64.ln()));
        assert!(e.eval(10.0) < 10.0);
        // monotonic through the knee
        let mut prev = 0.0;
        for i in 0..100 {
            let y = e.eval(f64::from(i) * 0.1);
            assert!(y >= prev);
            prev = y;
        }
    }

    #[test]
    fn knee_solver_hits_its_target() {
        for (x, y) in [(31.0, 10.3), (4.0, 2.0), (1000.0, 5.0)] {
            let f = solve_knee(x, y);
            assert!(f > 0.0);
            assert!((knee_curve(x, f) - y).abs() < 1e-6, "{x} {y}");
        }
        // no compression needed
        assert!(solve_knee(2.0, 3.0) < 1e-8);
        assert_eq!(solve_knee(0.0, 1.0), 0.0);
        assert_eq!(solve_knee(1.0, -1.0), 0.0);
        assert_eq!(solve_knee(f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn slider_knee_maps_top_stop_to_white() {
        let e = Exposure::from_knee_stops(-EXPOSURE_GAIN_OFFSET, 0.0, 0.0, 5.0);
        assert_eq!(e.knee_low, 1.0);
        assert!(e.knee_high > e.knee_low);
        assert!(close(e.eval(0.5), 0.5));
        assert!((e.eval(32.0) - 2f64.powf(KNEE_WHITE_STOPS)).abs() < 1e-6);
    }

    #[test]
    fn slider_knee_above_white_is_off() {
        let e = Exposure::from_knee_stops(0.0, 0.0, 4.0, 6.0);
        assert_eq!(e.knee_low, 16.0);
        assert_eq!(e.knee_high, 16.0);
        assert_eq!(e.stops, 0.0);
        assert!(ColorProfile::Exposure(e).prepare().is_ok());
    }

    #[test]
    fn exposure_on_integers_clips_after_gain() {
        let mut buf = PixelBuffer::from_vec(vec![0, 64, 255], 3, 1, PixelSpec::L_U8).unwrap();
        apply(&ColorProfile::Exposure(Exposure::default()), &mut buf).unwrap();
        assert_eq!(buf.as_bytes()[0], 0);
        assert_eq!(buf.as_bytes()[2], 255);
        // 64/255 * 2^2.47393 is above 1.0
        assert_eq!(buf.as_bytes()[1], 255);
    }

    #[test]
    fn non_finite_exposure_is_rejected() {
        let p = ColorProfile::Exposure(Exposure::new(f64::NAN, 0.0, 0.0, 0.0));
        assert!(matches!(p.prepare(), Err(Error::InvalidProfile(_))));
    }

    // --- scanline ---

    #[test]
    fn apply_scanline_checks_length() {
        let t = ColorProfile::gamma(2.0).prepare().unwrap();
        let mut row = [0u8; 7];
        assert_eq!(
            t.apply_scanline(&mut row, PixelSpec::RGB_U16).unwrap_err(),
            Error::LengthMismatch {
                expected: 6,
                actual: 7
            }
        );
    }

    #[test]
    fn apply_scanline_handles_packed_u10() {
        use crate::bitpack::{pack10, unpack10};
        let t = ColorProfile::gamma(1.0).prepare().unwrap();
        let mut row = pack10([1, 512, 1023]).to_ne_bytes();
        t.apply_scanline(&mut row, PixelSpec::RGB_U10).unwrap();
        assert_eq!(unpack10(u32::from_ne_bytes(row)), [1, 512, 1023]);
    }
}
