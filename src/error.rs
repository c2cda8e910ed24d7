//! Error types for Pixlet decoding.

use core::fmt;

/// The main error type for Pixlet decoding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Errors related to the frame header.
    Header(HeaderError),
    /// Errors related to the entropy-coded plane payloads.
    Stream(StreamError),
    /// Valid-looking input using features outside this decoder's support.
    Unsupported(UnsupportedError),
    /// A plane or scratch buffer could not be allocated.
    Allocation,
}

/// Errors related to the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    /// The declared packet size does not fit the input buffer.
    InvalidPacketSize,
    /// A fixed header word did not hold its required value.
    InvalidSentinel,
    /// Zero or overflowing image dimensions.
    InvalidDimensions,
    /// The frame does not use exactly four decomposition levels.
    InvalidLevelCount,
}

/// Errors related to the entropy-coded plane payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// A scaling factor or band scale parameter read as zero.
    ZeroScale,
    /// A detail band was not introduced by the expected magic word.
    BandMagicMismatch,
    /// A band parameter produced an escape prefix outside the valid width.
    PrefixTooWide,
    /// A zero run overran the subband or the 16-bit run cap.
    RunTooLong,
    /// The bitstream ended before the plane was complete.
    UnexpectedEof,
}

/// Features the bitstream may declare but this decoder does not handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedError {
    /// Bitstream version other than 1.
    Version(u32),
    /// Bit depth outside 8..=15.
    Depth(u32),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header(e) => write!(f, "{e}"),
            Self::Stream(e) => write!(f, "{e}"),
            Self::Unsupported(e) => write!(f, "{e}"),
            Self::Allocation => write!(f, "failed to allocate a decoding buffer"),
        }
    }
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPacketSize => write!(f, "invalid packet size"),
            Self::InvalidSentinel => write!(f, "invalid header sentinel"),
            Self::InvalidDimensions => write!(f, "invalid image dimensions"),
            Self::InvalidLevelCount => write!(f, "invalid wavelet level count"),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroScale => write!(f, "scale parameter is zero"),
            Self::BandMagicMismatch => write!(f, "missing magic word before detail band"),
            Self::PrefixTooWide => write!(f, "escape prefix width out of range"),
            Self::RunTooLong => write!(f, "zero run exceeds the subband"),
            Self::UnexpectedEof => write!(f, "unexpected end of bitstream"),
        }
    }
}

impl fmt::Display for UnsupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Version(v) => write!(f, "unsupported bitstream version {v}"),
            Self::Depth(d) => write!(f, "unsupported bit depth {d}"),
        }
    }
}

impl std::error::Error for DecodeError {}
impl std::error::Error for HeaderError {}
impl std::error::Error for StreamError {}
impl std::error::Error for UnsupportedError {}

impl From<HeaderError> for DecodeError {
    fn from(e: HeaderError) -> Self {
        Self::Header(e)
    }
}

impl From<StreamError> for DecodeError {
    fn from(e: StreamError) -> Self {
        Self::Stream(e)
    }
}

impl From<UnsupportedError> for DecodeError {
    fn from(e: UnsupportedError) -> Self {
        Self::Unsupported(e)
    }
}

/// Result type for Pixlet decoding operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

macro_rules! err {
    ($err:expr) => {
        Err($err.into())
    };
}

pub(crate) use bail;
pub(crate) use err;
