//! Frame decoder: keyframe handling, adaptive state lifetime and plane
//! assembly.
//!
//! Per-frame pipeline:
//! 1. Start a range decoder on the frame bytes
//! 2. Read the keyframe flag with a neutral probability
//! 3. Keyframe: parse and validate the header, then commit it and reset state
//! 4. Pick the residual source (same range decoder, or a Golomb-Rice bit
//!    reader starting after the header bytes)
//! 5. Decode the planes in coded order
//! 6. Report the frame and the number of bytes it used

use log::{debug, warn};

use crate::DecoderConfig;
use crate::error::{Ffv1Error, Ffv1Result};
use crate::frame::{Frame, FrameData, FrameInfo, chroma_size};
use crate::golomb::GolombReader;
use crate::header::{CoderType, StreamHeader, parse_header};
use crate::plane::{EntropyDecoder, PlaneState, decode_plane, decode_rgb};
use crate::range_coder::RangeDecoder;

/// Header and adaptive contexts established by the last keyframe.
struct StreamState {
    header: StreamHeader,
    /// Index 0 serves luma (or G); index 1 serves both chroma planes (or B
    /// and R).
    planes: [PlaneState; 2],
}

impl StreamState {
    fn new(header: StreamHeader) -> Ffv1Result<Self> {
        let planes = [
            PlaneState::new(header.coder, header.context_count)?,
            PlaneState::new(header.coder, header.context_count)?,
        ];
        Ok(StreamState { header, planes })
    }
}

/// Decoder for one stream of frames with fixed dimensions.
pub struct Decoder {
    config: DecoderConfig,
    stream: Option<StreamState>,
    /// Set when a frame failed after adapting the contexts; cleared by the
    /// next keyframe.
    needs_keyframe: bool,
    picture_number: u64,
}

impl Decoder {
    /// Create a decoder for frames of the configured size.
    pub fn new(config: DecoderConfig) -> Ffv1Result<Self> {
        config.validate()?;
        debug!(
            "decoder: {}x{}, row alignment {}",
            config.width, config.height, config.row_align
        );
        Ok(Decoder {
            config,
            stream: None,
            needs_keyframe: true,
            picture_number: 0,
        })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// The header committed by the most recent keyframe.
    pub fn header(&self) -> Option<&StreamHeader> {
        self.stream.as_ref().map(|s| &s.header)
    }

    /// Number of frames decoded successfully so far.
    pub fn picture_number(&self) -> u64 {
        self.picture_number
    }

    /// Decode one frame from `input`. Returns the frame and the number of
    /// bytes the frame occupied.
    pub fn decode_frame(&mut self, input: &[u8]) -> Ffv1Result<(Frame, usize)> {
        let mut rc = RangeDecoder::new(input)?;
        let key_frame = rc.decode_neutral_bit()?;

        if key_frame {
            let header = parse_header(&mut rc).inspect_err(|e| warn!("keyframe rejected: {e}"))?;
            let frame = self.allocate_frame(&header, key_frame)?;
            self.commit(header)?;
            self.decode_body(rc, input, frame)
        } else {
            let header = match &self.stream {
                Some(stream) if !self.needs_keyframe => &stream.header,
                _ => {
                    warn!("frame {} is not a keyframe; waiting for one", self.picture_number);
                    return Err(Ffv1Error::NoKeyframeYet);
                }
            };
            let frame = self.allocate_frame(header, key_frame)?;
            self.decode_body(rc, input, frame)
        }
    }

    fn allocate_frame(&self, header: &StreamHeader, key_frame: bool) -> Ffv1Result<Frame> {
        let info = FrameInfo {
            key_frame,
            picture_number: self.picture_number,
            width: self.config.width as usize,
            height: self.config.height as usize,
            coder: header.coder,
            colorspace: header.colorspace(),
            pixel_format: header.pixel_format,
            version: header.version,
        };
        Frame::allocate(info, self.config.row_align)
    }

    /// Install a validated header and return every context to its initial
    /// state. Existing context storage is reused when its shape still fits.
    fn commit(&mut self, header: StreamHeader) -> Ffv1Result<()> {
        let reusable = self.stream.as_ref().is_some_and(|s| {
            s.planes
                .iter()
                .all(|p| p.fits(header.coder, header.context_count))
        });

        match self.stream.as_mut() {
            Some(stream) if reusable => {
                for plane in &mut stream.planes {
                    plane.reset();
                }
                stream.header = header;
            }
            _ => {
                debug!(
                    "allocating {} contexts per plane type for {:?}",
                    header.context_count, header.coder
                );
                match StreamState::new(header) {
                    Ok(stream) => self.stream = Some(stream),
                    Err(e) => {
                        self.needs_keyframe = true;
                        return Err(e);
                    }
                }
            }
        }
        self.needs_keyframe = false;
        Ok(())
    }

    fn decode_body(
        &mut self,
        rc: RangeDecoder<'_>,
        input: &[u8],
        mut frame: Frame,
    ) -> Ffv1Result<(Frame, usize)> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Ffv1Error::NoKeyframeYet);
        };

        let mut entropy = match stream.header.coder {
            CoderType::RangeCoder => EntropyDecoder::Range(rc),
            CoderType::GolombRice => {
                let offset = rc.bytes_consumed();
                EntropyDecoder::Golomb {
                    reader: GolombReader::new(&input[offset..]),
                    offset,
                }
            }
        };

        if let Err(e) = decode_planes(stream, &mut entropy, &mut frame) {
            // The contexts have adapted to a partial frame.
            self.needs_keyframe = true;
            warn!("frame {} failed: {e}", self.picture_number);
            return Err(e);
        }

        let used = entropy.bytes_consumed();
        debug!(
            "frame {}: {}, {:?}, {} of {} bytes",
            self.picture_number,
            if frame.info().key_frame { "keyframe" } else { "inter" },
            stream.header.pixel_format,
            used,
            input.len()
        );

        self.picture_number += 1;
        Ok((frame, used))
    }
}

/// Decode every plane of `frame` in coded order.
fn decode_planes(
    stream: &mut StreamState,
    entropy: &mut EntropyDecoder<'_>,
    frame: &mut Frame,
) -> Ffv1Result<()> {
    let quant = &stream.header.quant_tables;
    let (width, height) = (frame.width(), frame.height());
    let shifts = stream.header.chroma_shifts();

    match frame.data_mut() {
        FrameData::Yuv(planes) => {
            let (cw, ch) = chroma_size(width, height, shifts);
            let [luma_state, chroma_state] = &mut stream.planes;
            for (i, plane) in planes.iter_mut().enumerate() {
                let (w, h, state) = if i == 0 {
                    (width, height, &mut *luma_state)
                } else {
                    (cw, ch, &mut *chroma_state)
                };
                let stride = plane.stride();
                decode_plane(entropy, state, quant, w, h, plane.data_mut(), stride)?;
            }
        }
        FrameData::Rgb(packed) => {
            let stride = packed.stride();
            decode_rgb(
                entropy,
                &mut stream.planes,
                quant,
                width,
                height,
                packed.data_mut(),
                stride,
            )?;
        }
    }
    Ok(())
}
