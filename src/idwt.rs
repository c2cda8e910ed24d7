//! Inverse wavelet synthesis over the in-place subband pyramid.

use crate::decode::NB_LEVELS;

// Synthesis taps of the fixed biorthogonal filter pair. The even taps
// reconstruct samples at even positions from the lowpass channel plus two
// highpass neighbours; the odd taps interleave both channels.
const EVEN_LOW_SIDE: f64 = -0.07576144003329376;
const EVEN_LOW_MID: f64 = 0.8586296626673486;
const EVEN_HIGH: f64 = 0.3535533905932737;
const ODD_LOW_SIDE: f64 = -0.01515228715813062;
const ODD_LOW_MID: f64 = 0.3687056777514043;
const ODD_HIGH_SIDE: f64 = 0.07071067811865475;
const ODD_HIGH_MID: f64 = -0.8485281374238569;

/// Run all synthesis levels over one plane, doubling the reconstructed
/// block each level. Rows are filtered in place with the vertical scale,
/// columns are bounced through `column` with the horizontal scale.
pub(crate) fn synthesize(
    dst: &mut [i16],
    lowpass_width: usize,
    lowpass_height: usize,
    stride: usize,
    scale_h: &[f64; NB_LEVELS],
    scale_v: &[f64; NB_LEVELS],
    column: &mut [i16],
    scratch: &mut [i16],
) {
    let mut width = lowpass_width;
    let mut height = lowpass_height;

    for level in 0..NB_LEVELS {
        width <<= 1;
        height <<= 1;

        for row in 0..height {
            let start = row * stride;
            filter1d(&mut dst[start..start + width], scratch, scale_v[level]);
        }

        for col in 0..width {
            for k in 0..height {
                column[k] = dst[col + k * stride];
            }

            filter1d(&mut column[..height], scratch, scale_h[level]);

            for k in 0..height {
                dst[col + k * stride] = column[k];
            }
        }
    }
}

/// Fold an extended lowpass index back into `0..len` by one-sided
/// reflection with edge repeat on both ends.
fn reflect_low(mut idx: isize, len: isize) -> usize {
    loop {
        if idx < 0 {
            idx = -idx - 1;
        } else if idx >= len {
            idx = 2 * len - 1 - idx;
        } else {
            return idx as usize;
        }
    }
}

/// Fold an extended highpass index back into `0..len`. The right-hand
/// reflection is shifted by one sample relative to the lowpass channel;
/// its axis falls on `len` itself and reads as zero (`None`).
fn reflect_high(mut idx: isize, len: isize) -> Option<usize> {
    loop {
        if idx < 0 {
            idx = -idx - 1;
        } else if idx == len {
            return None;
        } else if idx > len {
            idx = 2 * len - idx;
        } else {
            return Some(idx as usize);
        }
    }
}

/// One level of 1-D synthesis in place: the first half of `dest` holds the
/// lowpass channel, the second half the highpass channel. `scratch` must
/// hold at least `dest.len() + 16` samples.
pub(crate) fn filter1d(dest: &mut [i16], scratch: &mut [i16], scale: f64) {
    let half = dest.len() / 2;
    let low = 4;
    let high = half + 12;

    scratch[low..low + half].copy_from_slice(&dest[..half]);
    scratch[high..high + half].copy_from_slice(&dest[half..]);

    // Four samples of mirror padding on each side of both channels.
    let len = half as isize;
    for i in 1..=4usize {
        scratch[low - i] = scratch[low + reflect_low(-(i as isize), len)];
        scratch[low + half - 1 + i] = scratch[low + reflect_low(len - 1 + i as isize, len)];
        scratch[high - i] = match reflect_high(-(i as isize), len) {
            Some(k) => scratch[high + k],
            None => 0,
        };
        scratch[high + half - 1 + i] = match reflect_high(len - 1 + i as isize, len) {
            Some(k) => scratch[high + k],
            None => 0,
        };
    }

    for i in 0..half {
        let lo = |off: isize| f64::from(scratch[(low + i).wrapping_add_signed(off)]);
        let hi = |off: isize| f64::from(scratch[(high + i).wrapping_add_signed(off)]);

        let even = EVEN_LOW_SIDE * (lo(-1) + lo(1))
            + EVEN_LOW_MID * lo(0)
            + EVEN_HIGH * (hi(-1) + hi(0));
        let odd = ODD_LOW_SIDE * (lo(-1) + lo(2))
            + ODD_LOW_MID * (lo(0) + lo(1))
            + ODD_HIGH_SIDE * (hi(-1) + hi(1))
            + ODD_HIGH_MID * hi(0);

        dest[2 * i] = clip16(scale * even);
        dest[2 * i + 1] = clip16(scale * odd);
    }
}

#[inline]
fn clip16(value: f64) -> i16 {
    value.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}
