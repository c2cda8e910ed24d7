//! A memory-safe, pure-Rust decoder for the Apple Pixlet intraframe video
//! codec.
//!
//! Every Pixlet packet is self-contained: each of the three planes carries
//! a four-level wavelet pyramid whose coefficients are compressed with an
//! adaptive unary-prefix entropy coder. Decoding a packet yields a
//! [`Frame`] with one full-resolution luma plane and two half-resolution
//! chroma planes, all full-range unsigned 16-bit.
//!
//! ```no_run
//! let data = std::fs::read("frame.pxlt").unwrap();
//! let frame = pixlet::decode(&data).unwrap();
//! println!("{}x{} @ {} bits", frame.width, frame.height, frame.depth);
//! ```
//!
//! A [`Decoder`] can be reused across packets; its scratch buffers are
//! only reallocated when the frame dimensions change.

#![forbid(unsafe_code)]

mod bit_reader;
mod byte_reader;
mod decode;
mod entropy;
mod error;
mod frame;
mod header;
mod idwt;

pub use decode::Decoder;
pub use error::{DecodeError, HeaderError, Result, StreamError, UnsupportedError};
pub use frame::{ColorRange, Frame, PictureType, Plane};

/// Options controlling a [`Decoder`].
#[derive(Debug, Clone, Default)]
pub struct DecodeSettings {
    /// Decode only the luma plane. The chroma planes of the returned
    /// frame are filled with the neutral chroma word.
    pub luma_only: bool,
}

/// Decode a single packet with default settings.
pub fn decode(data: &[u8]) -> Result<Frame> {
    Decoder::new().decode(data)
}
