use std::io;

use thiserror::Error;

/// Errors that can occur while decoding an FFV1 stream.
///
/// Every variant aborts the current frame. The decoder never resynchronizes
/// on its own; callers recover by feeding a fresh keyframe.
#[derive(Debug, Error)]
pub enum Ffv1Error {
    /// The caller-supplied dimensions are unusable (zero width or height,
    /// or a row alignment that is not a power of two).
    #[error("invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    /// A keyframe header field contains an invalid value, including colour
    /// space / chroma subsampling pairs outside the supported profiles.
    #[error("malformed FFV1 header: {0}")]
    MalformedHeader(String),
    /// An entropy-coded symbol is out of the representable range.
    #[error("corrupt symbol: {0}")]
    CorruptSymbol(&'static str),
    /// The range coder or bit reader ran past the end of the input.
    #[error("unexpected end of compressed data")]
    InputExhausted,
    /// A non-keyframe arrived before any keyframe set up the decoder state.
    #[error("non-keyframe received before the first keyframe")]
    NoKeyframeYet,
    /// The output frame buffer could not be allocated or is unusable.
    #[error("frame buffer allocation failed: {0}")]
    BufferAllocationFailed(String),
}

impl From<io::Error> for Ffv1Error {
    fn from(_: io::Error) -> Self {
        // The only I/O is bit reading from an in-memory slice, which can
        // only fail by running out of bytes.
        Ffv1Error::InputExhausted
    }
}

/// Result alias used throughout the crate.
pub type Ffv1Result<T> = Result<T, Ffv1Error>;
