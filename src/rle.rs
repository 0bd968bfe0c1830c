//! Run-length coding shared by the SGI, Targa and IFF file formats.
//!
//! A stream is a sequence of packets. Each packet starts with a control value
//! that selects a *literal* run (N raw units follow) or a *repeat* run (one
//! unit follows, replicated N times). A unit is `channels` samples of
//! `sample_width` bytes, so per-pixel formats repeat whole pixels while
//! per-plane formats pass `channels = 1`.
//!
//! The formats differ only in packet framing, captured by [`RleScheme`]. The
//! free functions [`rle_decode`] / [`rle_encode`] use [`RleScheme::PACKED`].

use crate::error::{Error, Result};

/// Width of a packet's control value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ControlWidth {
    /// One byte.
    Byte,
    /// One sample (big-endian when samples are two bytes wide).
    Sample,
}

/// Packet framing for one file format.
///
/// The low seven bits of the control value hold the count; the high bit
/// selects between literal and repeat packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RleScheme {
    high_bit_repeats: bool,
    count_bias: usize,
    min_repeat: usize,
    control: ControlWidth,
    terminated: bool,
}

impl RleScheme {
    /// Generic byte-control framing: high bit set means repeat, count is the
    /// low seven bits (1..=127), a zero count ends the stream.
    pub const PACKED: Self = Self {
        high_bit_repeats: true,
        count_bias: 0,
        min_repeat: 2,
        control: ControlWidth::Byte,
        terminated: false,
    };

    /// Targa: high bit set means repeat, count is the low seven bits plus one
    /// (1..=128).
    pub const TARGA: Self = Self {
        high_bit_repeats: true,
        count_bias: 1,
        min_repeat: 2,
        control: ControlWidth::Byte,
        terminated: false,
    };

    /// IFF: Targa framing, repeats only for three or more equal units.
    pub const IFF: Self = Self {
        min_repeat: 3,
        ..Self::TARGA
    };

    /// SGI: sample-wide control, high bit set means *literal*, a zero control
    /// terminates each scanline.
    pub const SGI: Self = Self {
        high_bit_repeats: false,
        count_bias: 0,
        min_repeat: 3,
        control: ControlWidth::Sample,
        terminated: true,
    };

    /// Longest run one packet can carry.
    #[inline]
    pub const fn max_run(&self) -> usize {
        0x7f + self.count_bias
    }

    /// Shortest run the encoder emits as a repeat packet.
    #[inline]
    pub const fn min_repeat(&self) -> usize {
        self.min_repeat
    }

    /// Control value width.
    #[inline]
    pub const fn control(&self) -> ControlWidth {
        self.control
    }

    /// Whether a zero control ends every encoded scanline.
    #[inline]
    pub const fn terminated(&self) -> bool {
        self.terminated
    }

    /// Worst-case encoded size of `count` units, for sizing output buffers.
    ///
    /// `None` if the size does not fit in `usize`.
    pub fn max_encoded_len(
        &self,
        count: usize,
        sample_width: usize,
        channels: usize,
    ) -> Option<usize> {
        let cw = self.control_bytes(sample_width);
        let terminator = if self.terminated { cw } else { 0 };
        sample_width
            .checked_mul(channels)?
            .checked_add(cw)?
            .checked_mul(count)?
            .checked_add(terminator)
    }

    #[inline]
    const fn control_bytes(&self, sample_width: usize) -> usize {
        match self.control {
            ControlWidth::Byte => 1,
            ControlWidth::Sample => sample_width,
        }
    }

    fn read_control(&self, input: &[u8], pos: usize, cw: usize) -> Option<u16> {
        let bytes = input.get(pos..pos + cw)?;
        Some(match bytes {
            [b] => u16::from(*b),
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            _ => return None,
        })
    }

    fn write_control(
        &self,
        output: &mut [u8],
        pos: usize,
        cw: usize,
        run: usize,
        repeat: bool,
    ) -> Result<()> {
        // run is within 1..=max_run, so the low seven bits hold it
        let mut value = (run - self.count_bias) as u16;
        if repeat == self.high_bit_repeats {
            value |= 0x80;
        }
        let dst = reserve(output, pos, cw)?;
        match dst {
            [b] => *b = value as u8,
            _ => dst.copy_from_slice(&value.to_be_bytes()),
        }
        Ok(())
    }

    /// Decode packets until `expected_count` units have been produced.
    ///
    /// Returns the number of input bytes consumed. For terminated schemes a
    /// trailing zero control is consumed when present.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRleParameters`] if `sample_width` is not 1 or 2, or
    ///   `channels` is zero.
    /// - [`Error::TruncatedStream`] if input runs out, or a zero count ends the
    ///   stream, before `expected_count` units are produced.
    /// - [`Error::OverrunStream`] if a packet would write past `output`
    ///   (measured in units). Nothing past the capacity is ever written.
    pub fn decode(
        &self,
        input: &[u8],
        output: &mut [u8],
        expected_count: usize,
        sample_width: usize,
        channels: usize,
    ) -> Result<usize> {
        let unit = unit_size(sample_width, channels)?;
        let cw = self.control_bytes(sample_width);
        let capacity = output.len() / unit;
        let truncated = |produced| Error::TruncatedStream {
            produced,
            expected: expected_count,
        };

        let mut pos = 0;
        let mut produced = 0;
        while produced < expected_count {
            let ctrl = self
                .read_control(input, pos, cw)
                .ok_or_else(|| truncated(produced))?;
            pos += cw;
            let raw = usize::from(ctrl & 0x7f);
            if raw == 0 && self.count_bias == 0 {
                return Err(truncated(produced));
            }
            let count = raw + self.count_bias;
            let repeat = (ctrl & 0x80 != 0) == self.high_bit_repeats;
            if produced + count > capacity {
                return Err(Error::OverrunStream {
                    needed: produced + count,
                    capacity,
                });
            }

            let dst = &mut output[produced * unit..(produced + count) * unit];
            if repeat {
                let src = input
                    .get(pos..pos + unit)
                    .ok_or_else(|| truncated(produced))?;
                for chunk in dst.chunks_exact_mut(unit) {
                    chunk.copy_from_slice(src);
                }
                pos += unit;
            } else {
                let len = count * unit;
                let src = input
                    .get(pos..pos + len)
                    .ok_or_else(|| truncated(produced))?;
                dst.copy_from_slice(src);
                pos += len;
            }
            produced += count;
        }

        if self.terminated && self.read_control(input, pos, cw).is_some_and(|c| c & 0x7f == 0) {
            pos += cw;
        }
        Ok(pos)
    }

    /// Encode `count` units from `input` with the greedy packet choice.
    ///
    /// Runs of at least [`min_repeat`](Self::min_repeat) equal units become
    /// repeat packets; everything else becomes literal packets that stop just
    /// before the next such run. Both kinds are split at
    /// [`max_run`](Self::max_run). Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRleParameters`] as for [`decode`](Self::decode).
    /// - [`Error::LengthMismatch`] if `input` holds fewer than `count` units.
    /// - [`Error::OverrunStream`] if `output` is too small (measured in bytes;
    ///   see [`max_encoded_len`](Self::max_encoded_len)).
    pub fn encode(
        &self,
        input: &[u8],
        output: &mut [u8],
        count: usize,
        sample_width: usize,
        channels: usize,
    ) -> Result<usize> {
        let unit = unit_size(sample_width, channels)?;
        let cw = self.control_bytes(sample_width);
        let needed = count.checked_mul(unit).filter(|&n| n <= input.len());
        if needed.is_none() {
            return Err(Error::LengthMismatch {
                expected: count.saturating_mul(unit),
                actual: input.len(),
            });
        }
        let at = |i: usize| &input[i * unit..(i + 1) * unit];
        let max_run = self.max_run();
        let run_from = |i: usize, limit: usize| {
            let first = at(i);
            (i + 1..count.min(i + limit))
                .take_while(|&j| at(j) == first)
                .count()
                + 1
        };

        let mut i = 0;
        let mut pos = 0;
        while i < count {
            let run = run_from(i, max_run);
            if run >= self.min_repeat {
                self.write_control(output, pos, cw, run, true)?;
                pos += cw;
                reserve(output, pos, unit)?.copy_from_slice(at(i));
                pos += unit;
                i += run;
                continue;
            }

            let mut j = i + 1;
            while j < count && j - i < max_run && run_from(j, self.min_repeat) < self.min_repeat {
                j += 1;
            }
            self.write_control(output, pos, cw, j - i, false)?;
            pos += cw;
            let len = (j - i) * unit;
            reserve(output, pos, len)?.copy_from_slice(&input[i * unit..j * unit]);
            pos += len;
            i = j;
        }

        if self.terminated {
            reserve(output, pos, cw)?.fill(0);
            pos += cw;
        }
        Ok(pos)
    }
}

impl Default for RleScheme {
    fn default() -> Self {
        Self::PACKED
    }
}

fn unit_size(sample_width: usize, channels: usize) -> Result<usize> {
    if !matches!(sample_width, 1 | 2) || channels == 0 {
        return Err(Error::InvalidRleParameters {
            sample_width,
            channels,
        });
    }
    Ok(sample_width * channels)
}

fn reserve(output: &mut [u8], pos: usize, len: usize) -> Result<&mut [u8]> {
    let capacity = output.len();
    output.get_mut(pos..pos + len).ok_or(Error::OverrunStream {
        needed: pos + len,
        capacity,
    })
}

/// Decode a [`RleScheme::PACKED`] stream. See [`RleScheme::decode`].
///
/// # Errors
///
/// See [`RleScheme::decode`].
pub fn rle_decode(
    input: &[u8],
    output: &mut [u8],
    expected_count: usize,
    sample_width: usize,
    channels: usize,
) -> Result<usize> {
    RleScheme::PACKED.decode(input, output, expected_count, sample_width, channels)
}

/// Encode with [`RleScheme::PACKED`]. See [`RleScheme::encode`].
///
/// # Errors
///
/// See [`RleScheme::encode`].
pub fn rle_encode(
    input: &[u8],
    output: &mut [u8],
    count: usize,
    sample_width: usize,
    channels: usize,
) -> Result<usize> {
    RleScheme::PACKED.encode(input, output, count, sample_width, channels)
}
