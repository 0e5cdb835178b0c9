//! Pure Rust decoder for FFV1 version 0/1 lossless intra-only video.
//!
//! Frames are coded independently: each sample is predicted from its causal
//! neighbors with a median predictor and the residual is entropy coded with
//! either an adaptive binary range coder or adaptive Golomb-Rice codes.
//! Keyframes carry the stream header and reset all adaptive state; other
//! frames keep adapting the contexts left by the previous frame.
//!
//! Supported formats: YUV 4:4:4, 4:2:2, 4:2:0, 4:1:1 and 4:1:0 at 8 bits,
//! and RGB (coded as reversible G/B/R) output as packed 32-bit pixels.
//!
//! # Example
//!
//! ```no_run
//! use ffv1_rs::{Decoder, DecoderConfig};
//!
//! let packets: Vec<Vec<u8>> = Vec::new();
//! let mut decoder = Decoder::new(DecoderConfig::new(640, 480)).unwrap();
//! for packet in &packets {
//!     let (frame, used) = decoder.decode_frame(packet).unwrap();
//!     println!("frame {}: {} bytes", frame.info().picture_number, used);
//! }
//! ```

pub mod buffer;
mod decode;
pub mod error;
pub mod frame;
pub mod golomb;
pub mod header;
pub mod plane;
pub mod predictor;
pub mod range_coder;
pub mod symbol;

pub use decode::Decoder;
pub use error::{Ffv1Error, Ffv1Result};
pub use frame::{Frame, FrameData, FrameInfo, PackedPlane, Plane};
pub use header::{CoderType, ColorSpace, PixelFormat, StreamHeader};

/// Frame geometry supplied by the container.
///
/// The bitstream does not carry dimensions, so every frame of a stream is
/// decoded at this size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Luma width in pixels.
    pub width: u32,
    /// Luma height in pixels.
    pub height: u32,
    /// Row stride alignment of output planes, in samples. Must be a power of
    /// two; 1 gives tightly packed rows.
    pub row_align: usize,
}

impl DecoderConfig {
    pub fn new(width: u32, height: u32) -> Self {
        DecoderConfig {
            width,
            height,
            row_align: 1,
        }
    }

    pub fn with_row_align(mut self, row_align: usize) -> Self {
        self.row_align = row_align;
        self
    }

    fn validate(&self) -> Ffv1Result<()> {
        if self.width == 0 || self.height == 0 || !self.row_align.is_power_of_two() {
            return Err(Ffv1Error::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}
