//! Decoded frame representation.

use crate::error::{DecodeError, Result, err};
use crate::header::FrameHeader;

/// One plane of a decoded frame: full-range unsigned 16-bit samples at a
/// fixed row pitch.
#[derive(Debug, Clone)]
pub struct Plane {
    data: Vec<u16>,
    width: usize,
    height: usize,
    stride: usize,
}

impl Plane {
    fn new(
        width: usize,
        height: usize,
        aligned_width: usize,
        aligned_height: usize,
    ) -> Result<Self> {
        Ok(Self {
            data: try_zeroed(aligned_width * aligned_height)?,
            width,
            height,
            stride: aligned_width,
        })
    }

    /// Display width in samples. The backing buffer may be wider; see
    /// [`Self::stride`].
    pub fn width(&self) -> usize {
        self.width
    }

    /// Display height in samples.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row pitch of [`Self::data`] in samples.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The full backing buffer, including alignment rows and columns.
    pub fn data(&self) -> &[u16] {
        &self.data
    }

    /// Iterate the display rows, trimmed to the display width.
    pub fn rows(&self) -> impl Iterator<Item = &[u16]> {
        self.data
            .chunks_exact(self.stride)
            .take(self.height)
            .map(|row| &row[..self.width])
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u16] {
        &mut self.data
    }

    pub(crate) fn fill(&mut self, value: u16) {
        self.data.fill(value);
    }
}

/// Picture coding type of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    /// Every frame of the format is self-contained.
    Intra,
}

/// Sample range of the decoded planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRange {
    /// Broadcast range samples.
    Limited,
    /// Full range samples.
    Full,
}

/// A decoded frame: one luma plane and two chroma planes at half
/// resolution in both dimensions.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Display width in luma samples.
    pub width: u32,
    /// Display height in luma samples.
    pub height: u32,
    /// Bit depth the stream was coded at.
    pub depth: u32,
    /// Always [`PictureType::Intra`].
    pub picture_type: PictureType,
    /// Always `true`; every packet is a sync point.
    pub keyframe: bool,
    /// Always [`ColorRange::Full`].
    pub color_range: ColorRange,
    planes: [Plane; 3],
}

impl Frame {
    pub(crate) fn new(header: &FrameHeader) -> Result<Self> {
        let (width, height) = (header.width as usize, header.height as usize);
        let luma = Plane::new(width, height, header.aligned_width, header.aligned_height)?;
        let cb = Plane::new(
            width.div_ceil(2),
            height.div_ceil(2),
            header.aligned_width / 2,
            header.aligned_height / 2,
        )?;
        let cr = Plane::new(
            width.div_ceil(2),
            height.div_ceil(2),
            header.aligned_width / 2,
            header.aligned_height / 2,
        )?;

        Ok(Self {
            width: header.width,
            height: header.height,
            depth: header.depth,
            picture_type: PictureType::Intra,
            keyframe: true,
            color_range: ColorRange::Full,
            planes: [luma, cb, cr],
        })
    }

    /// All three planes in Y, Cb, Cr order.
    pub fn planes(&self) -> &[Plane; 3] {
        &self.planes
    }

    /// A single plane; index 0 is luma.
    pub fn plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    pub(crate) fn plane_mut(&mut self, index: usize) -> &mut Plane {
        &mut self.planes[index]
    }
}

/// A zero-filled buffer whose allocation failure surfaces as an error
/// instead of aborting.
pub(crate) fn try_zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();

    if buffer.try_reserve_exact(len).is_err() {
        return err!(DecodeError::Allocation);
    }
    buffer.resize(len, T::default());

    Ok(buffer)
}
