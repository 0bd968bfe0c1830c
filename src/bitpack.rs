//! 10-bit component packing.
//!
//! `RGB U10` stores three 10-bit components in one 32-bit word, red in the
//! top bits and two padding bits at the bottom (DPX/Cineon "method A"):
//!
//! ```text
//!  31        22 21        12 11         2 1 0
//! [    red     |   green    |    blue    |pad]
//! ```
//!
//! Single words are handled by [`pack10`] / [`unpack10`]; whole scanlines by
//! [`pack_rgb10`] / [`unpack_rgb10`], which also apply a file's word order.

use crate::error::{Error, Result};

/// Largest 10-bit value.
pub const U10_MAX: u16 = 1023;

/// Pack an RGB triple into one word. Components above 1023 saturate.
#[inline]
pub const fn pack10(rgb: [u16; 3]) -> u32 {
    (clamp10(rgb[0]) << 22) | (clamp10(rgb[1]) << 12) | (clamp10(rgb[2]) << 2)
}

#[inline]
const fn clamp10(v: u16) -> u32 {
    (if v > U10_MAX { U10_MAX } else { v }) as u32
}

/// Split a word into its RGB triple. The padding bits are ignored.
#[inline]
pub const fn unpack10(word: u32) -> [u16; 3] {
    let m = U10_MAX as u32;
    [
        ((word >> 22) & m) as u16,
        ((word >> 12) & m) as u16,
        ((word >> 2) & m) as u16,
    ]
}

/// Byte order of packed words in a serialized stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum WordOrder {
    /// Host order, as stored inside a `PixelBuffer`.
    #[default]
    Native,
    /// Most significant byte first (DPX default, Cineon).
    BigEndian,
    /// Least significant byte first.
    LittleEndian,
}

impl WordOrder {
    #[inline]
    fn encode(self, word: u32) -> [u8; 4] {
        match self {
            Self::Native => word.to_ne_bytes(),
            Self::BigEndian => word.to_be_bytes(),
            Self::LittleEndian => word.to_le_bytes(),
        }
    }

    #[inline]
    fn decode(self, bytes: [u8; 4]) -> u32 {
        match self {
            Self::Native => u32::from_ne_bytes(bytes),
            Self::BigEndian => u32::from_be_bytes(bytes),
            Self::LittleEndian => u32::from_le_bytes(bytes),
        }
    }
}

/// Pack interleaved RGB components (three per pixel) into 4-byte words.
///
/// # Errors
///
/// [`Error::LengthMismatch`] if `components` is not a whole number of pixels
/// or `out` is not exactly four bytes per pixel.
pub fn pack_rgb10(components: &[u16], out: &mut [u8], order: WordOrder) -> Result<()> {
    if components.len() % 3 != 0 {
        return Err(Error::LengthMismatch {
            expected: components.len() - components.len() % 3,
            actual: components.len(),
        });
    }
    let expected = components.len() / 3 * 4;
    if out.len() != expected {
        return Err(Error::LengthMismatch {
            expected,
            actual: out.len(),
        });
    }
    for (rgb, word) in components.chunks_exact(3).zip(out.chunks_exact_mut(4)) {
        word.copy_from_slice(&order.encode(pack10([rgb[0], rgb[1], rgb[2]])));
    }
    Ok(())
}

/// Unpack 4-byte words into interleaved RGB components.
///
/// # Errors
///
/// [`Error::LengthMismatch`] if `input` is not a whole number of words or
/// `out` does not hold exactly three components per word.
pub fn unpack_rgb10(input: &[u8], out: &mut [u16], order: WordOrder) -> Result<()> {
    if input.len() % 4 != 0 {
        return Err(Error::LengthMismatch {
            expected: input.len() - input.len() % 4,
            actual: input.len(),
        });
    }
    let expected = input.len() / 4 * 3;
    if out.len() != expected {
        return Err(Error::LengthMismatch {
            expected,
            actual: out.len(),
        });
    }
    for (word, rgb) in input.chunks_exact(4).zip(out.chunks_exact_mut(3)) {
        let w = order.decode([word[0], word[1], word[2], word[3]]);
        rgb.copy_from_slice(&unpack10(w));
    }
    Ok(())
}
