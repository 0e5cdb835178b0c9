//! Test-only FFV1 stream writer built from the crate's encoding primitives,
//! plus synthetic test pictures.

#![allow(dead_code)]

use ffv1_rs::buffer::RowBuffers;
use ffv1_rs::frame::unpack_rgb32;
use ffv1_rs::golomb::{GolombWriter, LOG2_RUN, VlcState, fold};
use ffv1_rs::predictor::{ContextModel, QUANT_TABLE_COUNT, QuantTable, QuantTables};
use ffv1_rs::range_coder::RangeEncoder;
use ffv1_rs::symbol::{NEUTRAL_SYMBOL_STATE, SymbolState, put_symbol};
use ffv1_rs::{CoderType, Frame};

/// Rows of 8-bit samples.
pub type Image = Vec<Vec<u8>>;

/// Rows of packed `B | G << 8 | R << 16` pixels.
pub type RgbImage = Vec<Vec<u32>>;

// ── Pictures ─────────────────────────────────────────────────────────

pub fn gradient(w: usize, h: usize, seed: usize) -> Image {
    (0..h)
        .map(|y| (0..w).map(|x| ((x * 7 + y * 13 + seed) & 255) as u8).collect())
        .collect()
}

/// Flat left half, noisy right half.
pub fn mixed(w: usize, h: usize, seed: usize) -> Image {
    (0..h)
        .map(|y| {
            (0..w)
                .map(|x| {
                    if x < w / 2 {
                        64
                    } else {
                        (((x * 37 + y * 91 + seed * 17) * (x + 3)) % 256) as u8
                    }
                })
                .collect()
        })
        .collect()
}

pub fn flat(w: usize, h: usize, value: u8) -> Image {
    vec![vec![value; w]; h]
}

pub fn rgb_image(w: usize, h: usize, seed: usize) -> RgbImage {
    (0..h)
        .map(|y| {
            (0..w)
                .map(|x| {
                    let b = (x * 29 + seed) & 255;
                    let g = (y * 53 + x * 3) & 255;
                    let r = (x * y + seed * 7) & 255;
                    (b | g << 8 | r << 16) as u32
                })
                .collect()
        })
        .collect()
}

pub fn flat_rgb(w: usize, h: usize, pixel: u32) -> RgbImage {
    vec![vec![pixel; w]; h]
}

// ── Header ───────────────────────────────────────────────────────────

/// Raw header fields, so tests can also write headers the decoder rejects.
#[derive(Debug, Clone, Copy)]
pub struct HeaderFields {
    pub version: u32,
    /// 0 selects Golomb-Rice, anything else the range coder.
    pub coder: u32,
    pub colorspace: u32,
    pub h_shift: u32,
    pub v_shift: u32,
}

impl HeaderFields {
    pub fn new(coder: CoderType, colorspace: u32, h_shift: u32, v_shift: u32) -> Self {
        HeaderFields {
            version: 0,
            coder: match coder {
                CoderType::GolombRice => 0,
                CoderType::RangeCoder => 1,
            },
            colorspace,
            h_shift,
            v_shift,
        }
    }
}

pub fn write_header_fields(rc: &mut RangeEncoder, fields: &HeaderFields) {
    let mut state = NEUTRAL_SYMBOL_STATE;
    put_symbol(rc, &mut state, fields.version as i32, false).unwrap();
    put_symbol(rc, &mut state, fields.coder as i32, false).unwrap();
    put_symbol(rc, &mut state, fields.colorspace as i32, false).unwrap();
    rc.encode_bit(&mut state[0], true);
    put_symbol(rc, &mut state, fields.h_shift as i32, false).unwrap();
    put_symbol(rc, &mut state, fields.v_shift as i32, false).unwrap();
    rc.encode_bit(&mut state[0], false);
}

/// Run-length code the non-negative half of `table`.
pub fn write_quant_table(rc: &mut RangeEncoder, table: &QuantTable) {
    let mut state = NEUTRAL_SYMBOL_STATE;
    let mut last = 0;
    for i in 1..128 {
        if table[i] != table[i - 1] {
            put_symbol(rc, &mut state, (i - last - 1) as i32, false).unwrap();
            last = i;
        }
    }
    put_symbol(rc, &mut state, (128 - last - 1) as i32, false).unwrap();
}

pub fn write_header(
    rc: &mut RangeEncoder,
    fields: &HeaderFields,
    tables: &[QuantTable; QUANT_TABLE_COUNT],
) {
    write_header_fields(rc, fields);
    for table in tables {
        write_quant_table(rc, table);
    }
}

/// A complete keyframe holding only a header.
pub fn header_only_keyframe(
    fields: &HeaderFields,
    tables: &[QuantTable; QUANT_TABLE_COUNT],
) -> Vec<u8> {
    let mut rc = RangeEncoder::new();
    rc.encode_neutral_bit(true);
    write_header(&mut rc, fields, tables);
    rc.terminate()
}

// ── Stream writer ────────────────────────────────────────────────────

/// Encodes pictures the way an FFV1 version 0 encoder does, keeping its own
/// adaptive state across frames.
pub struct StreamWriter {
    fields: HeaderFields,
    coder: CoderType,
    quant: QuantTables,
    range_states: [Vec<SymbolState>; 2],
    vlc_states: [Vec<VlcState>; 2],
}

impl StreamWriter {
    pub fn new(fields: HeaderFields, quant: QuantTables) -> Self {
        let coder = if fields.coder == 0 {
            CoderType::GolombRice
        } else {
            CoderType::RangeCoder
        };
        StreamWriter {
            fields,
            coder,
            quant,
            range_states: [Vec::new(), Vec::new()],
            vlc_states: [Vec::new(), Vec::new()],
        }
    }

    pub fn yuv(coder: CoderType, h_shift: u32, v_shift: u32, model: ContextModel) -> Self {
        Self::new(
            HeaderFields::new(coder, 0, h_shift, v_shift),
            QuantTables::standard(model),
        )
    }

    pub fn rgb(coder: CoderType, model: ContextModel) -> Self {
        Self::new(HeaderFields::new(coder, 1, 0, 0), QuantTables::standard(model))
    }

    fn begin(&mut self, key_frame: bool) -> RangeEncoder {
        let mut rc = RangeEncoder::new();
        rc.encode_neutral_bit(key_frame);
        if key_frame {
            write_header(&mut rc, &self.fields, self.quant.tables());
            let n = self.quant.context_count();
            self.range_states = [
                vec![NEUTRAL_SYMBOL_STATE; n],
                vec![NEUTRAL_SYMBOL_STATE; n],
            ];
            self.vlc_states = [vec![VlcState::default(); n], vec![VlcState::default(); n]];
        }
        rc
    }

    fn finish(&self, rc: RangeEncoder, bits: GolombWriter) -> Vec<u8> {
        let mut out = rc.terminate();
        if self.coder == CoderType::GolombRice {
            out.extend(bits.finish().unwrap());
        }
        out
    }

    /// Encode Y, Cb and Cr planes; chroma planes must already be subsampled.
    pub fn encode_yuv(&mut self, planes: &[Image; 3], key_frame: bool) -> Vec<u8> {
        let mut rc = self.begin(key_frame);
        let mut bits = GolombWriter::new();

        for (p, plane) in planes.iter().enumerate() {
            let mut rows = RowBuffers::new(plane[0].len());
            let mut run_index = 0;
            for line in plane {
                let line: Vec<i32> = line.iter().map(|&s| s as i32).collect();
                rows.advance();
                self.encode_line(
                    &mut rc,
                    &mut bits,
                    &mut rows,
                    p.min(1),
                    8,
                    &line,
                    &mut run_index,
                );
            }
        }
        self.finish(rc, bits)
    }

    pub fn encode_rgb(&mut self, image: &RgbImage, key_frame: bool) -> Vec<u8> {
        let mut rc = self.begin(key_frame);
        let mut bits = GolombWriter::new();

        let width = image[0].len();
        let mut rows = [
            RowBuffers::new(width),
            RowBuffers::new(width),
            RowBuffers::new(width),
        ];
        let mut run_index = 0;
        for line in image {
            let mut channels = [Vec::new(), Vec::new(), Vec::new()];
            for &pixel in line {
                let (g, b, r) = unpack_rgb32(pixel);
                channels[0].push(g);
                channels[1].push(b);
                channels[2].push(r);
            }
            for (p, channel) in channels.iter().enumerate() {
                rows[p].advance();
                self.encode_line(
                    &mut rc,
                    &mut bits,
                    &mut rows[p],
                    p.min(1),
                    9,
                    channel,
                    &mut run_index,
                );
            }
        }
        self.finish(rc, bits)
    }

    #[allow(clippy::too_many_arguments)]
    fn encode_line(
        &mut self,
        rc: &mut RangeEncoder,
        bits: &mut GolombWriter,
        rows: &mut RowBuffers,
        plane_type: usize,
        depth: u32,
        line: &[i32],
        run_index: &mut usize,
    ) {
        let mut run_mode = false;
        let mut run_count = 0u32;

        for (x, &sample) in line.iter().enumerate() {
            let n = rows.neighbors(x);
            let (context, negate) = self.quant.context_index(&n);
            let mut diff = sample - n.predict();
            if negate {
                diff = -diff;
            }
            let mut diff = fold(diff, depth);

            match self.coder {
                CoderType::RangeCoder => {
                    let state = &mut self.range_states[plane_type][context];
                    put_symbol(rc, state, diff, true).unwrap();
                }
                CoderType::GolombRice => {
                    if context == 0 {
                        run_mode = true;
                    }
                    if run_mode {
                        if diff != 0 {
                            flush_full_runs(bits, &mut run_count, run_index);
                            let log2 = LOG2_RUN[*run_index] as u32;
                            bits.write_bits(1 + log2, run_count).unwrap();
                            *run_index = run_index.saturating_sub(1);
                            run_count = 0;
                            run_mode = false;
                            if diff > 0 {
                                diff -= 1;
                            }
                        } else {
                            run_count += 1;
                        }
                    }
                    if !run_mode {
                        let state = &mut self.vlc_states[plane_type][context];
                        state.encode(bits, diff, depth).unwrap();
                    }
                }
            }
            rows.set(x, sample);
        }

        if run_mode {
            flush_full_runs(bits, &mut run_count, run_index);
            if run_count > 0 {
                bits.write_bit(true).unwrap();
            }
        }
    }
}

fn flush_full_runs(bits: &mut GolombWriter, run_count: &mut u32, run_index: &mut usize) {
    while *run_count >= 1 << LOG2_RUN[*run_index] {
        *run_count -= 1 << LOG2_RUN[*run_index];
        *run_index += 1;
        bits.write_bit(true).unwrap();
    }
}

// ── Frame inspection ─────────────────────────────────────────────────

/// Visible samples of each plane of a YUV frame.
pub fn yuv_planes(frame: &Frame) -> [Image; 3] {
    let planes = frame.planes().expect("not a YUV frame");
    planes
        .each_ref()
        .map(|p| (0..p.height()).map(|y| p.row(y).to_vec()).collect())
}

pub fn rgb_pixels(frame: &Frame) -> RgbImage {
    let packed = frame.packed().expect("not an RGB frame");
    (0..packed.height()).map(|y| packed.row(y).to_vec()).collect()
}
