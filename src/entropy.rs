//! The adaptive unary-prefix entropy coders for subband coefficients.
//!
//! Both coders alternate value runs and zero runs over a row-pitched
//! destination region. A small adaptive state tracks recent magnitudes and
//! controls the width of the escape prefix; short zero runs carry a one-bit
//! flag into the following value to nudge its magnitude. The low variant
//! fills the lowpass subband, the high variant reconstructs detail subbands
//! from per-band parameters.

use crate::bit_reader::BitReader;
use crate::error::{Result, StreamError, bail};

/// Per-band parameters of a detail subband, as read from the stream.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BandParams {
    /// Quantization step applied to decoded magnitudes.
    pub(crate) step: i32,
    /// Scale parameter controlling the width of the raw escape prefix.
    pub(crate) scale: i32,
    /// Adaptation weight for the coder state.
    pub(crate) weight: i32,
}

/// Writes coefficients into a row-pitched matrix region, wrapping to the
/// next row every `width` samples.
struct CoeffSink<'a> {
    dst: &'a mut [i16],
    width: usize,
    stride: usize,
    row: usize,
    col: usize,
}

impl<'a> CoeffSink<'a> {
    fn new(dst: &'a mut [i16], width: usize, stride: usize) -> Self {
        Self { dst, width, stride, row: 0, col: 0 }
    }

    #[inline(always)]
    fn push(&mut self, value: i16) {
        self.dst[self.row + self.col] = value;
        self.col += 1;

        if self.col == self.width {
            self.col = 0;
            self.row += self.stride;
        }
    }
}

/// Prefix width for a zero run, valid for `0 <= state <= 63`.
#[inline]
fn run_prefix_width(state: i64) -> u32 {
    let clz = if state == 0 { 32 } else { (state as u32).leading_zeros() };

    (((state + 8) >> 5) as u32) + clz - 24
}

/// Decode `size` lowpass coefficients into `dst` and return the number of
/// whole bytes consumed after byte alignment.
pub(crate) fn read_low_coeffs(
    data: &[u8],
    dst: &mut [i16],
    size: usize,
    width: usize,
    stride: usize,
) -> Result<usize> {
    let mut bits = BitReader::new(data);
    let mut sink = CoeffSink::new(dst, width, stride);
    let mut state: i64 = 3;
    let mut flag: i64 = 0;
    let mut i = 0;

    while i < size {
        let nbits = u32::min(31 ^ (((state >> 8) + 3) as u32).leading_zeros(), 14);

        let cnt1 = bits.read_unary(8).ok_or(StreamError::UnexpectedEof)?;
        let escape = if cnt1 < 8 {
            let max_escape = (1i64 << nbits) - 1;
            let value = bits.peek_bits(nbits) as i64;

            if value <= 1 {
                bits.skip_bits(nbits - 1).ok_or(StreamError::UnexpectedEof)?;
                max_escape * i64::from(cnt1)
            } else {
                bits.skip_bits(nbits).ok_or(StreamError::UnexpectedEof)?;
                value + max_escape * i64::from(cnt1) - 1
            }
        } else {
            i64::from(bits.read_bits(16).ok_or(StreamError::UnexpectedEof)?)
        };

        let nudged = escape + flag;
        let sign = -(nudged & 1) | 1;
        sink.push((sign * ((nudged + 1) >> 1)) as i16);
        i += 1;
        state += 120 * nudged - ((120 * state) >> 8);
        flag = 0;

        if !(0..=0x3f).contains(&state) || i >= size {
            continue;
        }

        let nbits = run_prefix_width(state);
        let escape_mask = (1i64 << nbits) - 1;
        let cnt1 = bits.read_unary(8).ok_or(StreamError::UnexpectedEof)?;
        let rlen = if cnt1 > 7 {
            i64::from(bits.read_bits(16).ok_or(StreamError::UnexpectedEof)?)
        } else {
            let value = bits.peek_bits(nbits) as i64;

            if value > 1 {
                bits.skip_bits(nbits).ok_or(StreamError::UnexpectedEof)?;
                value + escape_mask * i64::from(cnt1) - 1
            } else {
                bits.skip_bits(nbits - 1).ok_or(StreamError::UnexpectedEof)?;
                escape_mask * i64::from(cnt1)
            }
        };

        if rlen > (size - i) as i64 {
            bail!(StreamError::RunTooLong);
        }

        for _ in 0..rlen {
            sink.push(0);
        }
        i += rlen as usize;

        state = 0;
        flag = i64::from(rlen < 0xffff);
    }

    bits.align();
    Ok(bits.consumed_bytes())
}

/// Decode `size` detail coefficients into `dst` and return the number of
/// whole bytes consumed after byte alignment.
pub(crate) fn read_high_coeffs(
    data: &[u8],
    dst: &mut [i16],
    size: usize,
    width: usize,
    stride: usize,
    params: BandParams,
) -> Result<usize> {
    let BandParams { step, scale, weight } = params;
    let mut bits = BitReader::new(data);
    let mut sink = CoeffSink::new(dst, width, stride);

    if scale == 0 {
        bail!(StreamError::ZeroScale);
    }

    // Two's-complement-safe magnitude, biased by one for non-negative
    // scales; i64 keeps `scale == i32::MIN` representable so the width
    // check below rejects it.
    let magnitude =
        i64::from(scale >= 0) + i64::from(scale ^ (scale >> 31)) - i64::from(scale >> 31);
    let nbits = if magnitude != 1 {
        let nbits = 33 - ((magnitude - 1) as u32).leading_zeros();

        if nbits > 16 {
            bail!(StreamError::PrefixTooWide);
        }
        nbits
    } else {
        1
    };
    let length = 25 - nbits;

    let mut state: i64 = 3;
    let mut flag: i64 = 0;
    let mut i = 0;

    while i < size {
        let magnitude_width: i64 = if state >> 8 != -3 {
            i64::from(31 ^ (((state >> 8) + 3) as u32).leading_zeros())
        } else {
            -1
        };

        let mut cnt1 = bits.read_unary(length).ok_or(StreamError::UnexpectedEof)?;
        if cnt1 >= length {
            cnt1 = bits.read_bits(nbits).ok_or(StreamError::UnexpectedEof)?;
        } else {
            let pfx = magnitude_width.min(14);

            if pfx < 1 {
                bail!(StreamError::PrefixTooWide);
            }

            cnt1 *= (1u32 << pfx) - 1;
            let shown = bits.peek_bits(pfx as u32);

            if shown <= 1 {
                bits.skip_bits(pfx as u32 - 1).ok_or(StreamError::UnexpectedEof)?;
            } else {
                bits.skip_bits(pfx as u32).ok_or(StreamError::UnexpectedEof)?;
                cnt1 += shown - 1;
            }
        }

        let sym = flag + i64::from(cnt1);
        let coeff = if sym == 0 {
            0
        } else {
            let parity = sym & 1;
            let level = i64::from(step) * ((sym + 1) >> 1) + i64::from(step >> 1);

            parity + (level ^ -parity)
        };
        sink.push(coeff as i16);
        i += 1;
        state = state.wrapping_add(
            i64::from(weight).wrapping_mul(sym) - (i64::from(weight).wrapping_mul(state) >> 8),
        );
        flag = 0;

        if !(0..=0x3f).contains(&state) || i >= size {
            continue;
        }

        let pfx = run_prefix_width(state);
        let escape_mask = (1i64 << pfx) - 1;
        let cnt1 = bits.read_unary(8).ok_or(StreamError::UnexpectedEof)?;
        let rlen = if cnt1 < 8 {
            let value = bits.peek_bits(pfx) as i64;

            if value > 1 {
                bits.skip_bits(pfx).ok_or(StreamError::UnexpectedEof)?;
                value + escape_mask * i64::from(cnt1) - 1
            } else {
                bits.skip_bits(pfx - 1).ok_or(StreamError::UnexpectedEof)?;
                escape_mask * i64::from(cnt1)
            }
        } else {
            let value = if bits.read_bit().ok_or(StreamError::UnexpectedEof)? != 0 {
                bits.read_bits(16).ok_or(StreamError::UnexpectedEof)?
            } else {
                bits.read_bits(8).ok_or(StreamError::UnexpectedEof)?
            };

            i64::from(value) + 8 * escape_mask
        };

        if rlen > 0xffff || rlen > (size - i) as i64 {
            bail!(StreamError::RunTooLong);
        }

        for _ in 0..rlen {
            sink.push(0);
        }
        i += rlen as usize;

        state = 0;
        flag = i64::from(rlen < 0xffff);
    }

    bits.align();
    Ok(bits.consumed_bytes())
}

#[cfg(test)]
mod tests {
    use super::{BandParams, read_high_coeffs, read_low_coeffs};
    use crate::error::{DecodeError, StreamError};

    #[test]
    fn low_single_value() {
        // Unary 2, then a sub-threshold peek: escape 2 decodes as +1.
        let mut dst = [0i16; 1];
        let consumed = read_low_coeffs(&[0xc0], &mut dst, 1, 1, 0).unwrap();

        assert_eq!(dst, [1]);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn low_zero_run_carries_flag() {
        // A zero value, a three-coefficient zero run, then escape 2, which
        // the carried flag nudges to magnitude 2 with negative sign.
        let mut dst = [99i16; 5];
        let consumed = read_low_coeffs(&[0x04, 0xc0], &mut dst, 5, 5, 0).unwrap();

        assert_eq!(dst, [0, 0, 0, 0, -2]);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn low_escape_at_unary_cap_reads_raw() {
        // Eight 1-bits hit the unary cap; the escape is a raw 16-bit word.
        let mut dst = [0i16; 1];
        let consumed = read_low_coeffs(&[0xff, 0x01, 0x02], &mut dst, 1, 1, 0).unwrap();

        assert_eq!(dst, [129]);
        assert_eq!(consumed, 3);
    }

    #[test]
    fn low_run_past_subband_is_rejected() {
        let mut dst = [0i16; 2];
        let result = read_low_coeffs(&[0x04], &mut dst, 2, 2, 0);

        assert_eq!(result, Err(DecodeError::Stream(StreamError::RunTooLong)));
    }

    #[test]
    fn low_wraps_rows_at_width() {
        // Same stream as `low_zero_run_carries_flag`, but emitted into a
        // 2-wide region with a 4-sample stride.
        let mut dst = [99i16; 12];
        read_low_coeffs(&[0x04, 0xc0], &mut dst, 5, 2, 4).unwrap();

        assert_eq!(dst[0..2], [0, 0]);
        assert_eq!(dst[4..6], [0, 0]);
        assert_eq!(dst[8], -2);
        assert_eq!(dst[2], 99);
    }

    fn params(step: i32, scale: i32, weight: i32) -> BandParams {
        BandParams { step, scale, weight }
    }

    #[test]
    fn high_single_value() {
        // Unary 1 with step 2 decodes as -3.
        let mut dst = [0i16; 1];
        let consumed =
            read_high_coeffs(&[0x80], &mut dst, 1, 1, 0, params(2, -1, 256)).unwrap();

        assert_eq!(dst, [-3]);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn high_zero_then_run() {
        // A zero symbol drops the state to zero, gating a two-sample run.
        let mut dst = [99i16; 3];
        let consumed =
            read_high_coeffs(&[0x00, 0xc0], &mut dst, 3, 3, 0, params(2, -1, 256)).unwrap();

        assert_eq!(dst, [0, 0, 0]);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn high_unary_cap_reads_raw_prefix() {
        // scale 0x4000 gives a 16-bit raw prefix behind a 9-long unary cap.
        let mut dst = [0i16; 1];
        let consumed = read_high_coeffs(
            &[0xff, 0x80, 0x02, 0x80],
            &mut dst,
            1,
            1,
            0,
            params(10, 0x4000, 256),
        )
        .unwrap();

        assert_eq!(dst, [-35]);
        assert_eq!(consumed, 4);
    }

    #[test]
    fn high_rejects_zero_scale() {
        let mut dst = [0i16; 1];
        let result = read_high_coeffs(&[0x00], &mut dst, 1, 1, 0, params(1, 0, 1));

        assert_eq!(result, Err(DecodeError::Stream(StreamError::ZeroScale)));
    }

    #[test]
    fn high_rejects_wide_prefix() {
        let mut dst = [0i16; 1];
        let result = read_high_coeffs(&[0x00], &mut dst, 1, 1, 0, params(1, 0x4000_0000, 1));

        assert_eq!(result, Err(DecodeError::Stream(StreamError::PrefixTooWide)));
    }

    #[test]
    fn high_long_run_via_byte_escape() {
        // Unary cap in the run gate selects the 8-bit escape: the run is
        // the raw byte plus eight times the escape mask.
        let mut dst = [99i16; 2042];
        let consumed =
            read_high_coeffs(&[0x7f, 0x80, 0x40], &mut dst, 2042, 2042, 0, params(2, -1, 256))
                .unwrap();

        assert!(dst.iter().all(|&v| v == 0));
        assert_eq!(consumed, 3);
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let mut dst = [0i16; 4];
        let result = read_low_coeffs(&[], &mut dst, 4, 4, 0);

        assert_eq!(result, Err(DecodeError::Stream(StreamError::UnexpectedEof)));
    }
}
