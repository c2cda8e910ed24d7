//! Frame header parsing and validation.

use log::{debug, warn};

use crate::byte_reader::Reader;
use crate::decode::NB_LEVELS;
use crate::error::{HeaderError, Result, UnsupportedError, bail};

/// Plane dimensions are stored rounded up to this multiple.
const ALIGN: u32 = 1 << (NB_LEVELS as u32 + 1);

/// Validated frame parameters, fixed for one packet.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameHeader {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) depth: u32,
    pub(crate) aligned_width: usize,
    pub(crate) aligned_height: usize,
}

/// Parse and validate the byte-aligned packet prefix. Every field is
/// checked before the caller allocates anything.
pub(crate) fn read_header(reader: &mut Reader<'_>) -> Result<FrameHeader> {
    let packet_size = reader.read_u32().ok_or(HeaderError::InvalidPacketSize)?;
    if packet_size <= 44 || packet_size as usize - 4 > reader.remaining() {
        bail!(HeaderError::InvalidPacketSize);
    }

    let version = reader.read_u32_le().ok_or(HeaderError::InvalidPacketSize)?;
    if version != 1 {
        warn!("unsupported bitstream version {version}");
        bail!(UnsupportedError::Version(version));
    }

    reader.skip_bytes(4).ok_or(HeaderError::InvalidPacketSize)?;
    if reader.read_u32().ok_or(HeaderError::InvalidPacketSize)? != 1 {
        bail!(HeaderError::InvalidSentinel);
    }
    reader.skip_bytes(4).ok_or(HeaderError::InvalidPacketSize)?;

    let width = reader.read_u32().ok_or(HeaderError::InvalidPacketSize)?;
    let height = reader.read_u32().ok_or(HeaderError::InvalidPacketSize)?;
    if width == 0
        || height == 0
        || width > i32::MAX as u32 - (ALIGN - 1)
        || height > i32::MAX as u32 - (ALIGN - 1)
    {
        bail!(HeaderError::InvalidDimensions);
    }

    let levels = reader.read_u32().ok_or(HeaderError::InvalidPacketSize)?;
    if levels != NB_LEVELS as u32 {
        bail!(HeaderError::InvalidLevelCount);
    }

    let depth = reader.read_u32().ok_or(HeaderError::InvalidPacketSize)?;
    if !(8..=15).contains(&depth) {
        bail!(UnsupportedError::Depth(depth));
    }

    reader.skip_bytes(8).ok_or(HeaderError::InvalidPacketSize)?;

    debug!("frame {width}x{height}, depth {depth}");

    Ok(FrameHeader {
        width,
        height,
        depth,
        aligned_width: align(width),
        aligned_height: align(height),
    })
}

fn align(value: u32) -> usize {
    ((value + (ALIGN - 1)) & !(ALIGN - 1)) as usize
}
