//! Keyframe header: coder selection, colour format and quantization tables.
//!
//! The header is range coded right after the keyframe flag. All scalar fields
//! share one symbol context that starts neutral; each quantization table is
//! sent with a fresh context of its own.

use log::{trace, warn};

use crate::error::{Ffv1Error, Ffv1Result};
use crate::predictor::{QUANT_TABLE_COUNT, QuantTable, QuantTables};
use crate::range_coder::RangeDecoder;
use crate::symbol::{NEUTRAL_SYMBOL_STATE, SymbolState, get_symbol};

/// Upper bound on the quantization-table product (and so on contexts).
pub const MAX_CONTEXT_PRODUCT: usize = 32768;

/// Entropy coder used for residuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoderType {
    /// Adaptive Golomb-Rice codes with run mode.
    GolombRice,
    /// Symbols over the binary range coder.
    RangeCoder,
}

/// Colour space of the coded planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Planar Y, Cb, Cr at 8 bits.
    Yuv,
    /// G, B, R coded as 9-bit planes and output as packed 32-bit pixels.
    Rgb,
}

/// Output layout implied by the colour space and chroma subsampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Yuv444p,
    Yuv422p,
    Yuv420p,
    Yuv411p,
    Yuv410p,
    Rgb32,
}

impl PixelFormat {
    /// Map header fields to a supported format.
    fn from_header(colorspace: u32, h_shift: u32, v_shift: u32) -> Ffv1Result<Self> {
        let unsupported = || {
            Ffv1Error::MalformedHeader(format!(
                "unsupported format: colorspace {colorspace}, chroma shift {h_shift}x{v_shift}"
            ))
        };

        match (colorspace, h_shift, v_shift) {
            (0, 0, 0) => Ok(PixelFormat::Yuv444p),
            (0, 1, 0) => Ok(PixelFormat::Yuv422p),
            (0, 1, 1) => Ok(PixelFormat::Yuv420p),
            (0, 2, 0) => Ok(PixelFormat::Yuv411p),
            (0, 2, 2) => Ok(PixelFormat::Yuv410p),
            (0, _, _) => {
                warn!("format not supported: chroma shift {h_shift}x{v_shift}");
                Err(unsupported())
            }
            (1, 0, 0) => Ok(PixelFormat::Rgb32),
            (1, _, _) => {
                warn!("chroma subsampling not supported in RGB colorspace");
                Err(unsupported())
            }
            _ => {
                warn!("colorspace {colorspace} not supported");
                Err(unsupported())
            }
        }
    }

    pub fn colorspace(&self) -> ColorSpace {
        match self {
            PixelFormat::Rgb32 => ColorSpace::Rgb,
            _ => ColorSpace::Yuv,
        }
    }

    /// `(horizontal, vertical)` chroma subsampling as right-shifts.
    pub fn chroma_shifts(&self) -> (u32, u32) {
        match self {
            PixelFormat::Yuv444p | PixelFormat::Rgb32 => (0, 0),
            PixelFormat::Yuv422p => (1, 0),
            PixelFormat::Yuv420p => (1, 1),
            PixelFormat::Yuv411p => (2, 0),
            PixelFormat::Yuv410p => (2, 2),
        }
    }
}

/// A fully validated keyframe header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    pub version: u32,
    pub coder: CoderType,
    pub pixel_format: PixelFormat,
    pub quant_tables: QuantTables,
    /// Contexts per plane type: `ceil(product of table levels / 2)`.
    pub context_count: usize,
}

impl StreamHeader {
    pub fn colorspace(&self) -> ColorSpace {
        self.pixel_format.colorspace()
    }

    pub fn chroma_shifts(&self) -> (u32, u32) {
        self.pixel_format.chroma_shifts()
    }
}

/// Parse a keyframe header. Nothing outside the range decoder is touched, so
/// a failed parse leaves the caller's state as it was.
pub fn parse_header(rc: &mut RangeDecoder<'_>) -> Ffv1Result<StreamHeader> {
    let mut state = NEUTRAL_SYMBOL_STATE;

    let version = read_unsigned(rc, &mut state)?;
    let coder = match read_unsigned(rc, &mut state)? {
        0 => CoderType::GolombRice,
        _ => CoderType::RangeCoder,
    };
    let colorspace = read_unsigned(rc, &mut state)?;
    // Chroma planes present; always assumed.
    rc.decode_bit(&mut state[0])?;
    let h_shift = read_unsigned(rc, &mut state)?;
    let v_shift = read_unsigned(rc, &mut state)?;
    // Transparency plane; never coded by this format version.
    rc.decode_bit(&mut state[0])?;

    let pixel_format = PixelFormat::from_header(colorspace, h_shift, v_shift)?;

    let mut tables = [[0i32; 256]; QUANT_TABLE_COUNT];
    let mut product = 1usize;
    for (i, table) in tables.iter_mut().enumerate() {
        let levels = read_quant_table(rc, table, product)?;
        product *= levels;
        if product > MAX_CONTEXT_PRODUCT {
            warn!("quantization table {i} pushes context product to {product}");
            return Err(Ffv1Error::MalformedHeader(format!(
                "context product {product} exceeds {MAX_CONTEXT_PRODUCT}"
            )));
        }
        trace!("quant table {i}: {levels} levels");
    }
    let context_count = product.div_ceil(2);

    trace!(
        "header: version {version}, {coder:?}, {pixel_format:?}, {context_count} contexts"
    );

    Ok(StreamHeader {
        version,
        coder,
        pixel_format,
        quant_tables: QuantTables::new(tables),
        context_count,
    })
}

/// Read one run-length coded quantization table into `table`, scaling every
/// step by `scale`. Returns the table's level count (`2 * steps - 1`).
fn read_quant_table(
    rc: &mut RangeDecoder<'_>,
    table: &mut QuantTable,
    scale: usize,
) -> Ffv1Result<usize> {
    let mut state = NEUTRAL_SYMBOL_STATE;
    let mut i = 0usize;
    let mut v = 0usize;

    while i < 128 {
        let len = read_unsigned(rc, &mut state)? as usize + 1;
        if len + i > 128 {
            warn!("quantization table run of {len} overflows at entry {i}");
            return Err(Ffv1Error::MalformedHeader(
                "quantization table overflows 128 entries".into(),
            ));
        }
        table[i..i + len].fill((scale * v) as i32);
        i += len;
        v += 1;
    }

    // Odd symmetry around zero
    for i in 1..128 {
        table[256 - i] = -table[i];
    }
    table[128] = -table[127];

    Ok(2 * v - 1)
}

fn read_unsigned(rc: &mut RangeDecoder<'_>, state: &mut SymbolState) -> Ffv1Result<u32> {
    Ok(get_symbol(rc, state, false)? as u32)
}
