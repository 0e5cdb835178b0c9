//! Plane and line decoding: context selection, MED prediction, residual
//! decoding and, for Golomb-Rice streams, run mode.

use log::trace;

use crate::buffer::RowBuffers;
use crate::error::{Ffv1Error, Ffv1Result};
use crate::frame::pack_rgb32;
use crate::golomb::{GolombReader, LOG2_RUN, VlcState};
use crate::header::CoderType;
use crate::predictor::{QuantTables, reconstruct};
use crate::range_coder::RangeDecoder;
use crate::symbol::{NEUTRAL_SYMBOL_STATE, SymbolState, get_symbol};

/// Sample depth of YUV planes.
pub const YUV_SAMPLE_BITS: u32 = 8;

/// Sample depth of the coded G, B and R planes.
pub const RGB_SAMPLE_BITS: u32 = 9;

// ── Per-plane-type adaptive state ────────────────────────────────────

/// Context states for one plane type, shaped by the coder in use.
#[derive(Debug, Clone)]
enum ContextStates {
    Range(Vec<SymbolState>),
    Golomb(Vec<VlcState>),
}

/// Adaptive state shared by every plane of one plane type.
#[derive(Debug, Clone)]
pub struct PlaneState {
    contexts: ContextStates,
}

impl PlaneState {
    /// Allocate `context_count` fresh contexts for `coder`.
    pub fn new(coder: CoderType, context_count: usize) -> Ffv1Result<Self> {
        let contexts = match coder {
            CoderType::RangeCoder => ContextStates::Range(alloc_filled(
                context_count,
                NEUTRAL_SYMBOL_STATE,
            )?),
            CoderType::GolombRice => {
                ContextStates::Golomb(alloc_filled(context_count, VlcState::default())?)
            }
        };
        Ok(PlaneState { contexts })
    }

    pub fn coder(&self) -> CoderType {
        match self.contexts {
            ContextStates::Range(_) => CoderType::RangeCoder,
            ContextStates::Golomb(_) => CoderType::GolombRice,
        }
    }

    pub fn context_count(&self) -> usize {
        match &self.contexts {
            ContextStates::Range(states) => states.len(),
            ContextStates::Golomb(states) => states.len(),
        }
    }

    /// Whether this state can be reused for a stream with this layout.
    pub fn fits(&self, coder: CoderType, context_count: usize) -> bool {
        self.coder() == coder && self.context_count() == context_count
    }

    /// Return every context to its initial state, keeping the allocation.
    pub fn reset(&mut self) {
        match &mut self.contexts {
            ContextStates::Range(states) => states.fill(NEUTRAL_SYMBOL_STATE),
            ContextStates::Golomb(states) => states.fill(VlcState::default()),
        }
    }
}

fn alloc_filled<T: Clone>(len: usize, value: T) -> Ffv1Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| Ffv1Error::BufferAllocationFailed(e.to_string()))?;
    v.resize(len, value);
    Ok(v)
}

// ── Residual source ──────────────────────────────────────────────────

/// Where residuals come from once the header has been read.
pub enum EntropyDecoder<'a> {
    /// Residuals continue on the same range decoder as the header.
    Range(RangeDecoder<'a>),
    /// Residuals are bit-packed Golomb-Rice codes starting `offset` bytes
    /// into the frame.
    Golomb {
        reader: GolombReader<'a>,
        offset: usize,
    },
}

impl EntropyDecoder<'_> {
    /// Bytes of the frame consumed so far.
    pub fn bytes_consumed(&self) -> usize {
        match self {
            EntropyDecoder::Range(rc) => rc.bytes_consumed(),
            EntropyDecoder::Golomb { reader, offset } => offset + reader.bytes_consumed(),
        }
    }
}

// ── Line decoding ────────────────────────────────────────────────────

/// Run coding phases. Only used by the Golomb-Rice coder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    /// Every sample carries a coded residual.
    Off,
    /// Zero residuals in runs of `2^LOG2_RUN[index]`; a continuation bit is
    /// read whenever the pending count reaches zero.
    Full,
    /// The final, explicitly sized run. One escaped residual ends it.
    Last,
}

/// Decode one line of `rows.width()` samples of depth `bits` into the
/// current row. `run_index` carries run-length adaptation between lines.
pub fn decode_line(
    entropy: &mut EntropyDecoder<'_>,
    state: &mut PlaneState,
    quant: &QuantTables,
    rows: &mut RowBuffers,
    bits: u32,
    run_index: &mut usize,
) -> Ffv1Result<()> {
    match (entropy, &mut state.contexts) {
        (EntropyDecoder::Range(rc), ContextStates::Range(states)) => {
            decode_line_range(rc, states, quant, rows, bits)
        }
        (EntropyDecoder::Golomb { reader, .. }, ContextStates::Golomb(states)) => {
            decode_line_golomb(reader, states, quant, rows, bits, run_index)
        }
        _ => Err(Ffv1Error::CorruptSymbol("context state does not match coder")),
    }
}

fn decode_line_range(
    rc: &mut RangeDecoder<'_>,
    states: &mut [SymbolState],
    quant: &QuantTables,
    rows: &mut RowBuffers,
    bits: u32,
) -> Ffv1Result<()> {
    for x in 0..rows.width() {
        let n = rows.neighbors(x);
        let (context, negate) = quant.context_index(&n);
        let state = states
            .get_mut(context)
            .ok_or(Ffv1Error::CorruptSymbol("context index out of range"))?;

        let mut diff = get_symbol(rc, state, true)?;
        if negate {
            diff = -diff;
        }
        rows.set(x, reconstruct(n.predict(), diff, bits));
    }
    Ok(())
}

fn decode_line_golomb(
    reader: &mut GolombReader<'_>,
    states: &mut [VlcState],
    quant: &QuantTables,
    rows: &mut RowBuffers,
    bits: u32,
    run_index: &mut usize,
) -> Ffv1Result<()> {
    let width = rows.width();
    let mut mode = RunMode::Off;
    let mut run_count: i32 = 0;

    for x in 0..width {
        let n = rows.neighbors(x);
        let (context, negate) = quant.context_index(&n);
        let state = states
            .get_mut(context)
            .ok_or(Ffv1Error::CorruptSymbol("context index out of range"))?;

        if context == 0 && mode == RunMode::Off {
            mode = RunMode::Full;
        }

        let mut diff = if mode == RunMode::Off {
            state.decode(reader, bits)?
        } else {
            if run_count == 0 && mode == RunMode::Full {
                let log2 = LOG2_RUN[*run_index];
                if reader.read_bit()? {
                    run_count = 1 << log2;
                    if x + run_count as usize <= width {
                        if *run_index + 1 >= LOG2_RUN.len() {
                            return Err(Ffv1Error::CorruptSymbol("run index overflow"));
                        }
                        *run_index += 1;
                    }
                } else {
                    run_count = reader.read_bits(log2 as u32)? as i32;
                    *run_index = run_index.saturating_sub(1);
                    mode = RunMode::Last;
                }
            }

            run_count -= 1;
            if run_count < 0 {
                mode = RunMode::Off;
                run_count = 0;
                // A zero residual would have extended the run.
                let d = state.decode(reader, bits)?;
                if d >= 0 { d + 1 } else { d }
            } else {
                0
            }
        };

        if negate {
            diff = -diff;
        }
        rows.set(x, reconstruct(n.predict(), diff, bits));
    }
    Ok(())
}

// ── Plane decoding ───────────────────────────────────────────────────

/// Decode a `width` x `height` plane of 8-bit samples into `out`, whose rows
/// start every `stride` bytes.
pub fn decode_plane(
    entropy: &mut EntropyDecoder<'_>,
    state: &mut PlaneState,
    quant: &QuantTables,
    width: usize,
    height: usize,
    out: &mut [u8],
    stride: usize,
) -> Ffv1Result<()> {
    let mut rows = RowBuffers::new(width);
    let mut run_index = 0usize;

    for (y, dst) in out.chunks_mut(stride).take(height).enumerate() {
        rows.advance();
        decode_line(entropy, state, quant, &mut rows, YUV_SAMPLE_BITS, &mut run_index)
            .inspect_err(|e| trace!("plane line {y}: {e}"))?;
        for (d, &s) in dst[..width].iter_mut().zip(rows.current_row()) {
            *d = s as u8;
        }
    }
    Ok(())
}

/// Decode interleaved G, B, R lines and pack each pixel into `out`.
///
/// G uses the luma plane state; B and R share the chroma one. One run index
/// serves all three planes.
pub fn decode_rgb(
    entropy: &mut EntropyDecoder<'_>,
    states: &mut [PlaneState; 2],
    quant: &QuantTables,
    width: usize,
    height: usize,
    out: &mut [u32],
    stride: usize,
) -> Ffv1Result<()> {
    let mut rows = [
        RowBuffers::new(width),
        RowBuffers::new(width),
        RowBuffers::new(width),
    ];
    let mut run_index = 0usize;

    for (y, dst) in out.chunks_mut(stride).take(height).enumerate() {
        for (p, plane_rows) in rows.iter_mut().enumerate() {
            plane_rows.advance();
            decode_line(
                entropy,
                &mut states[p.min(1)],
                quant,
                plane_rows,
                RGB_SAMPLE_BITS,
                &mut run_index,
            )
            .inspect_err(|e| trace!("rgb line {y}, plane {p}: {e}"))?;
        }

        let [g, b, r] = &rows;
        for (x, d) in dst[..width].iter_mut().enumerate() {
            *d = pack_rgb32(
                g.current_row()[x],
                b.current_row()[x],
                r.current_row()[x],
            );
        }
    }
    Ok(())
}
