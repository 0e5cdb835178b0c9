//! Decoded frames and their plane buffers.

use crate::error::{Ffv1Error, Ffv1Result};
use crate::header::{CoderType, ColorSpace, PixelFormat};

/// Metadata about one decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub key_frame: bool,
    /// Zero-based count of frames decoded successfully before this one.
    pub picture_number: u64,
    pub width: usize,
    pub height: usize,
    pub coder: CoderType,
    pub colorspace: ColorSpace,
    pub pixel_format: PixelFormat,
    /// Version field of the keyframe header in effect.
    pub version: u32,
}

/// One plane of 8-bit samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<u8>,
}

/// Packed 32-bit pixels, `B | G << 8 | R << 16`, top byte zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedPlane {
    width: usize,
    height: usize,
    stride: usize,
    data: Vec<u32>,
}

fn alloc_zeroed<T: Clone + Default>(
    width: usize,
    height: usize,
    align: usize,
) -> Ffv1Result<(usize, Vec<T>)> {
    let stride = width.next_multiple_of(align);
    let len = stride.checked_mul(height).ok_or_else(|| {
        Ffv1Error::BufferAllocationFailed(format!("{stride}x{height} plane overflows"))
    })?;

    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|e| Ffv1Error::BufferAllocationFailed(e.to_string()))?;
    data.resize(len, T::default());
    Ok((stride, data))
}

impl Plane {
    /// A zeroed plane whose stride is `width` rounded up to `align` samples.
    pub fn new(width: usize, height: usize, align: usize) -> Ffv1Result<Self> {
        let (stride, data) = alloc_zeroed(width, height, align)?;
        Ok(Plane {
            width,
            height,
            stride,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance between row starts, in samples.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// All samples including row padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The visible samples of row `y`.
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn sample(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.stride + x]
    }
}

impl PackedPlane {
    pub fn new(width: usize, height: usize, align: usize) -> Ffv1Result<Self> {
        let (stride, data) = alloc_zeroed(width, height, align)?;
        Ok(PackedPlane {
            width,
            height,
            stride,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance between row starts, in pixels.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    pub fn row(&self, y: usize) -> &[u32] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.data[y * self.stride + x]
    }
}

/// Sample storage of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameData {
    /// Y, Cb, Cr; chroma planes are subsampled per the pixel format.
    Yuv([Plane; 3]),
    Rgb(PackedPlane),
}

/// A decoded picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    info: FrameInfo,
    data: FrameData,
}

impl Frame {
    /// Allocate zeroed storage for a `width` x `height` picture.
    pub(crate) fn allocate(info: FrameInfo, row_align: usize) -> Ffv1Result<Self> {
        let (width, height) = (info.width, info.height);
        let data = match info.pixel_format {
            PixelFormat::Rgb32 => FrameData::Rgb(PackedPlane::new(width, height, row_align)?),
            format => {
                let (cw, ch) = chroma_size(width, height, format.chroma_shifts());
                FrameData::Yuv([
                    Plane::new(width, height, row_align)?,
                    Plane::new(cw, ch, row_align)?,
                    Plane::new(cw, ch, row_align)?,
                ])
            }
        };
        Ok(Frame { info, data })
    }

    pub fn info(&self) -> &FrameInfo {
        &self.info
    }

    pub fn data(&self) -> &FrameData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut FrameData {
        &mut self.data
    }

    pub fn into_data(self) -> FrameData {
        self.data
    }

    pub fn width(&self) -> usize {
        self.info.width
    }

    pub fn height(&self) -> usize {
        self.info.height
    }

    /// The Y, Cb and Cr planes of a YUV frame.
    pub fn planes(&self) -> Option<&[Plane; 3]> {
        match &self.data {
            FrameData::Yuv(planes) => Some(planes),
            FrameData::Rgb(_) => None,
        }
    }

    /// The packed pixels of an RGB frame.
    pub fn packed(&self) -> Option<&PackedPlane> {
        match &self.data {
            FrameData::Rgb(packed) => Some(packed),
            FrameData::Yuv(_) => None,
        }
    }
}

/// Chroma plane size: luma size shifted down, rounding up.
pub fn chroma_size(width: usize, height: usize, (h_shift, v_shift): (u32, u32)) -> (usize, usize) {
    (
        width.div_ceil(1 << h_shift),
        height.div_ceil(1 << v_shift),
    )
}

/// Undo the reversible colour transform and pack one pixel.
///
/// `b` and `r` arrive offset by 256; the packed value wraps like a 32-bit
/// unsigned sum.
#[inline]
pub fn pack_rgb32(g: i32, b: i32, r: i32) -> u32 {
    let b = b - 0x100;
    let r = r - 0x100;
    let g = g - ((b + r) >> 2);
    let b = b + g;
    let r = r + g;
    (b as u32)
        .wrapping_add((g as u32) << 8)
        .wrapping_add((r as u32) << 16)
}

/// Forward colour transform: packed pixel to coded `(g, b, r)`.
pub fn unpack_rgb32(pixel: u32) -> (i32, i32, i32) {
    let b = (pixel & 0xFF) as i32;
    let g = ((pixel >> 8) & 0xFF) as i32;
    let r = ((pixel >> 16) & 0xFF) as i32;

    let b = b - g;
    let r = r - g;
    let g = g + ((b + r) >> 2);
    (g, b + 0x100, r + 0x100)
}
