//! Per-component quantization rules.
//!
//! Every conversion between sample types goes through the functions here so
//! the converter and the profile engine round identically:
//!
//! - integer to integer rescales by the ratio of full-scale values,
//!   rounding to nearest with ties away from zero;
//! - integer to float divides by full scale;
//! - float to integer clamps to `[0, 1]` (NaN becomes 0), multiplies by full
//!   scale, and rounds the same way.

use half::f16;

use crate::format::SampleType;

/// One decoded component, keeping integer values exact until they are stored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    /// Integer sample with its full-scale value.
    Int {
        /// Stored value.
        value: u32,
        /// Full-scale value of the source type.
        max: u32,
    },
    /// Float sample, 1.0 is reference white.
    Float(f32),
}

impl Value {
    /// Fully opaque alpha.
    pub const OPAQUE: Self = Self::Float(1.0);

    /// Normalized float value.
    #[inline]
    pub fn to_f32(self) -> f32 {
        match self {
            Self::Int { value, max } => int_to_float(value, max),
            Self::Float(f) => f,
        }
    }

    /// Integer value at full scale `max`.
    #[inline]
    pub fn to_int(self, max: u32) -> u32 {
        match self {
            Self::Int { value, max: from } => rescale_int(value, from, max),
            Self::Float(f) => float_to_int(f, max),
        }
    }
}

/// Rescale an integer by `to_max / from_max`, rounding half away from zero.
#[inline]
pub fn rescale_int(value: u32, from_max: u32, to_max: u32) -> u32 {
    if from_max == to_max || from_max == 0 {
        return value.min(to_max);
    }
    let v = u64::from(value.min(from_max));
    let (from, to) = (u64::from(from_max), u64::from(to_max));
    ((v * to * 2 + from) / (from * 2)) as u32
}

/// Map `[0, max]` onto `[0.0, 1.0]`.
#[inline]
pub fn int_to_float(value: u32, max: u32) -> f32 {
    (f64::from(value) / f64::from(max)) as f32
}

/// Clamp to `[0, 1]`, scale to `[0, max]`, round half away from zero.
#[inline]
pub fn float_to_int(value: f32, max: u32) -> u32 {
    if value.is_nan() {
        return 0;
    }
    let v = f64::from(value.clamp(0.0, 1.0));
    (v * f64::from(max)).round() as u32
}

/// Read one unpacked component. `bytes` holds exactly one component.
///
/// `U10` components are not addressable on their own; see [`crate::bitpack`].
#[inline]
pub(crate) fn load(bytes: &[u8], sample: SampleType) -> Value {
    match sample {
        SampleType::U8 => Value::Int {
            value: u32::from(bytes[0]),
            max: 255,
        },
        SampleType::U10 | SampleType::U16 => Value::Int {
            value: u32::from(u16::from_ne_bytes([bytes[0], bytes[1]])),
            max: sample.max_value().unwrap_or(65535),
        },
        SampleType::F16 => Value::Float(f16::from_ne_bytes([bytes[0], bytes[1]]).to_f32()),
        SampleType::F32 => Value::Float(f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
    }
}

/// Write one unpacked component into `out` (exactly one component wide).
#[inline]
pub(crate) fn store(value: Value, sample: SampleType, out: &mut [u8]) {
    match sample {
        SampleType::U8 => out[0] = value.to_int(255) as u8,
        SampleType::U10 => out.copy_from_slice(&(value.to_int(1023) as u16).to_ne_bytes()),
        SampleType::U16 => out.copy_from_slice(&(value.to_int(65535) as u16).to_ne_bytes()),
        SampleType::F16 => out.copy_from_slice(&f16::from_f32(value.to_f32()).to_ne_bytes()),
        SampleType::F32 => out.copy_from_slice(&value.to_f32().to_ne_bytes()),
    }
}
