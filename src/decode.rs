//! The per-plane decoding pipeline and the reusable decoder instance.

use log::warn;

use crate::DecodeSettings;
use crate::byte_reader::Reader;
use crate::entropy::{BandParams, read_high_coeffs, read_low_coeffs};
use crate::error::{Result, StreamError, bail};
use crate::frame::{Frame, try_zeroed};
use crate::header::{self, FrameHeader};
use crate::idwt;

/// Number of wavelet decomposition levels; the format always uses four.
pub(crate) const NB_LEVELS: usize = 4;

/// Word introducing every detail band.
const BAND_MAGIC: u32 = 0xdead_beef;

/// Chroma word produced by a zero sample at any depth.
const NEUTRAL_CHROMA: u16 = 1 << 15;

/// A rectangular coefficient block within a plane buffer.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SubBand {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) size: usize,
    pub(crate) x: usize,
    pub(crate) y: usize,
}

/// Lay out the lowpass band and the three detail bands of every level
/// within a plane of `width` by `height` samples. Band 0 is the lowpass;
/// bands `3k+1..=3k+3` are the HL, LH and HH details of level `k`, from
/// the coarsest level outward.
pub(crate) fn band_layout(width: usize, height: usize) -> [SubBand; NB_LEVELS * 3 + 1] {
    let mut bands = [SubBand::default(); NB_LEVELS * 3 + 1];

    bands[0].width = width >> NB_LEVELS;
    bands[0].height = height >> NB_LEVELS;
    bands[0].size = bands[0].width * bands[0].height;

    for i in 0..NB_LEVELS * 3 {
        let shift = NB_LEVELS - i / 3;
        let (w, h) = (width >> shift, height >> shift);
        let band = &mut bands[i + 1];

        band.width = w;
        band.height = h;
        band.size = w * h;
        band.x = if (i + 1) % 3 != 2 { w } else { 0 };
        band.y = if (i + 1) % 3 != 1 { h } else { 0 };
    }

    bands
}

/// A reusable Pixlet decoder.
///
/// Scratch buffers persist across packets and are reallocated only when
/// the aligned frame dimensions change. Instances share nothing; decode
/// frames concurrently by giving each thread its own decoder.
pub struct Decoder {
    settings: DecodeSettings,
    width: usize,
    height: usize,
    column: Vec<i16>,
    filter_scratch: Vec<i16>,
    prediction: Vec<i16>,
}

impl Decoder {
    /// Create a decoder with default settings.
    pub fn new() -> Self {
        Self::with_settings(DecodeSettings::default())
    }

    /// Create a decoder with the given settings.
    pub fn with_settings(settings: DecodeSettings) -> Self {
        Self {
            settings,
            width: 0,
            height: 0,
            column: Vec::new(),
            filter_scratch: Vec::new(),
            prediction: Vec::new(),
        }
    }

    /// Decode one self-contained packet into a frame.
    ///
    /// The decoder stays usable after an error; the failed frame is
    /// discarded.
    pub fn decode(&mut self, packet: &[u8]) -> Result<Frame> {
        let mut reader = Reader::new(packet);
        let header = header::read_header(&mut reader)?;

        self.ensure_scratch(&header)?;

        let mut frame = Frame::new(&header)?;

        let num_planes = if self.settings.luma_only { 1 } else { 3 };
        for plane in 0..num_planes {
            self.decode_plane(&mut reader, &mut frame, plane)?;
        }

        postprocess_luma(frame.plane_mut(0).data_mut(), header.depth);
        if self.settings.luma_only {
            frame.plane_mut(1).fill(NEUTRAL_CHROMA);
            frame.plane_mut(2).fill(NEUTRAL_CHROMA);
        } else {
            postprocess_chroma(frame.plane_mut(1).data_mut(), header.depth);
            postprocess_chroma(frame.plane_mut(2).data_mut(), header.depth);
        }

        Ok(frame)
    }

    /// Reallocate the scratch buffers if the aligned dimensions changed.
    /// A failed allocation resets the cached dimensions so the next call
    /// starts from scratch.
    fn ensure_scratch(&mut self, header: &FrameHeader) -> Result<()> {
        let (w, h) = (header.aligned_width, header.aligned_height);

        if self.width == w && self.height == h {
            return Ok(());
        }

        self.width = 0;
        self.height = 0;
        self.column = try_zeroed(h)?;
        self.filter_scratch = try_zeroed(w.max(h) + 16)?;
        self.prediction = try_zeroed(w >> NB_LEVELS)?;
        self.width = w;
        self.height = h;

        Ok(())
    }

    fn decode_plane(
        &mut self,
        reader: &mut Reader<'_>,
        frame: &mut Frame,
        index: usize,
    ) -> Result<()> {
        let shift = usize::from(index > 0);
        let width = self.width >> shift;
        let height = self.height >> shift;
        let stride = width;

        // Scales are transmitted from the finest synthesis level down.
        let mut scale_h = [0.0; NB_LEVELS];
        let mut scale_v = [0.0; NB_LEVELS];
        for level in (0..NB_LEVELS).rev() {
            let h = reader.read_i32().ok_or(StreamError::UnexpectedEof)?;
            let v = reader.read_i32().ok_or(StreamError::UnexpectedEof)?;

            if h == 0 || v == 0 {
                bail!(StreamError::ZeroScale);
            }

            scale_h[level] = 1.0e6 / f64::from(h);
            scale_v[level] = 1.0e6 / f64::from(v);
        }

        reader.skip_bytes(4).ok_or(StreamError::UnexpectedEof)?;

        let bands = band_layout(width, height);
        let (bw, bh) = (bands[0].width, bands[0].height);
        let dst = bytemuck::cast_slice_mut::<u16, i16>(frame.plane_mut(index).data_mut());

        // The lowpass DC seed is transmitted directly; the remainder of
        // the lowpass band arrives as three disjoint coefficient regions.
        dst[0] = reader.read_i16().ok_or(StreamError::UnexpectedEof)?;

        let consumed = read_low_coeffs(reader.tail(), &mut dst[1..], bw - 1, bw - 1, 0)?;
        reader.skip_bytes(consumed).ok_or(StreamError::UnexpectedEof)?;

        let consumed = read_low_coeffs(reader.tail(), &mut dst[stride..], bh - 1, 1, stride)?;
        reader.skip_bytes(consumed).ok_or(StreamError::UnexpectedEof)?;

        let consumed = read_low_coeffs(
            reader.tail(),
            &mut dst[stride + 1..],
            (bw - 1) * (bh - 1),
            bw - 1,
            stride,
        )?;
        reader.skip_bytes(consumed).ok_or(StreamError::UnexpectedEof)?;

        for band in &bands[1..] {
            let a = reader.read_i32().ok_or(StreamError::UnexpectedEof)?;
            let b = reader.read_i32().ok_or(StreamError::UnexpectedEof)?;
            let c = reader.read_i32().ok_or(StreamError::UnexpectedEof)?;
            let d = reader.read_i32().ok_or(StreamError::UnexpectedEof)?;

            let magic = reader.read_u32().ok_or(StreamError::UnexpectedEof)?;
            if magic != BAND_MAGIC {
                warn!("wrong magic word 0x{magic:08x} in plane {index}");
                bail!(StreamError::BandMagicMismatch);
            }

            let params = BandParams {
                step: c,
                scale: if b >= a.wrapping_abs() { b } else { a },
                weight: d,
            };
            let offset = band.y * stride + band.x;
            let consumed = read_high_coeffs(
                reader.tail(),
                &mut dst[offset..],
                band.size,
                band.width,
                stride,
                params,
            )?;
            reader.skip_bytes(consumed).ok_or(StreamError::UnexpectedEof)?;
        }

        lowpass_prediction(dst, &mut self.prediction[..bw], bw, bh, stride);

        idwt::synthesize(
            dst,
            bw,
            bh,
            stride,
            &scale_h,
            &scale_v,
            &mut self.column,
            &mut self.filter_scratch,
        );

        Ok(())
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Causal 2-D prediction over the lowpass band, in place. Every sample
/// first accumulates its column running sum, then its row running sum;
/// all arithmetic wraps at 16 bits.
fn lowpass_prediction(
    dst: &mut [i16],
    pred: &mut [i16],
    width: usize,
    height: usize,
    stride: usize,
) {
    pred[..width].fill(0);

    let mut row = 0;
    for _ in 0..height {
        let line = &mut dst[row..row + width];

        let val = pred[0].wrapping_add(line[0]);
        line[0] = val;
        pred[0] = val;

        for j in 1..width {
            let val = pred[j].wrapping_add(line[j]);
            pred[j] = val;
            line[j] = val.wrapping_add(line[j - 1]);
        }

        row += stride;
    }
}

/// Square-law luma transfer: negative samples clamp to black, samples past
/// the coded white point to full scale, and everything between follows the
/// integer rounding of `(y / max)^2` scaled to 16 bits.
fn postprocess_luma(samples: &mut [u16], depth: u32) {
    let max = i64::from((1i32 << depth) - 1);
    let max_sq = max * max;

    for sample in samples {
        let value = i64::from(*sample as i16);

        *sample = if value <= 0 {
            0
        } else if value > max {
            u16::MAX
        } else {
            ((value * value * 65535 + max_sq / 2) / max_sq) as u16
        };
    }
}

/// Chroma bias and shift up to 16 bits; wraps rather than saturates.
fn postprocess_chroma(samples: &mut [u16], depth: u32) {
    let bias = 1i32 << (depth - 1);
    let shift = 16 - depth;

    for sample in samples {
        *sample = ((i32::from(*sample as i16) + bias) << shift) as u16;
    }
}
