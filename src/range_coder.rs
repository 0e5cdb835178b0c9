//! Binary adaptive range coder for FFV1 entropy coding.
//!
//! Every decision is coded against an 8-bit probability state (the chance of
//! a `0`, scaled to 256). After each decision the state moves along one of
//! two fixed transition tables toward the observed outcome.
//!
//! The range is kept in 16 bits and renormalized one byte at a time.

use crate::error::{Ffv1Error, Ffv1Result};

// ── State-transition tables ──────────────────────────────────────────

/// Neutral probability (50/50) that every adaptive state starts from.
pub const NEUTRAL_STATE: u8 = 128;

/// Adaptation speed: 0.05 in 32-bit fixed point, truncated.
const RAC_FACTOR: i64 = 214_748_364;

/// Highest state value a `1` decision may move to.
const RAC_MAX_P: i64 = 256 - 8;

/// Build the `(zero_state, one_state)` transition tables.
///
/// `one_state[s]` is the state after coding a `1` from state `s`;
/// `zero_state` mirrors it. States 1..=7 and 249..=255 are unreachable.
const fn build_states(factor: i64, max_p: i64) -> ([u8; 256], [u8; 256]) {
    let one: i64 = 1 << 32;
    let mut zero_state = [0u8; 256];
    let mut one_state = [0u8; 256];

    let mut last_p8: i64 = 0;
    let mut p: i64 = one / 2;
    let mut i = 0;
    while i < 128 {
        let mut p8 = (256 * p + one / 2) >> 32;
        if p8 <= last_p8 {
            p8 = last_p8 + 1;
        }
        if last_p8 != 0 && last_p8 < 256 && p8 <= max_p {
            one_state[last_p8 as usize] = p8 as u8;
        }
        p += ((one - p) * factor + one / 2) >> 32;
        last_p8 = p8;
        i += 1;
    }

    let mut i = 256 - max_p;
    while i <= max_p {
        if one_state[i as usize] == 0 {
            let mut p = (i * one + 128) >> 8;
            p += ((one - p) * factor + one / 2) >> 32;
            let mut p8 = (256 * p + one / 2) >> 32;
            if p8 <= i {
                p8 = i + 1;
            }
            if p8 > max_p {
                p8 = max_p;
            }
            one_state[i as usize] = p8 as u8;
        }
        i += 1;
    }

    let mut i = 1;
    while i < 255 {
        // 256 wraps to 0 for the unreachable low states.
        zero_state[i] = (256 - one_state[256 - i] as i64) as u8;
        i += 1;
    }

    (zero_state, one_state)
}

const STATE_TABLES: ([u8; 256], [u8; 256]) = build_states(RAC_FACTOR, RAC_MAX_P);

/// Next state after decoding/encoding a `0`.
pub const ZERO_STATE: [u8; 256] = STATE_TABLES.0;

/// Next state after decoding/encoding a `1`.
pub const ONE_STATE: [u8; 256] = STATE_TABLES.1;

/// Bytes the decoder may pull past the end of its input. A terminated stream
/// is pre-read by exactly one byte; a second one means the input was cut.
const MAX_OVERREAD: usize = 1;

// ── Decoder ──────────────────────────────────────────────────────────

/// Range decoder over a borrowed byte slice.
pub struct RangeDecoder<'a> {
    data: &'a [u8],
    /// Bytes pulled so far, including zero-filled over-reads.
    pos: usize,
    low: u32,
    range: u32,
}

impl<'a> RangeDecoder<'a> {
    /// Initialize from the start of a frame: `low` takes the first two bytes.
    pub fn new(data: &'a [u8]) -> Ffv1Result<Self> {
        let mut rc = RangeDecoder {
            data,
            pos: 0,
            low: 0,
            range: 0xFF00,
        };
        let hi = rc.read_byte()? as u32;
        let lo = rc.read_byte()? as u32;
        rc.low = (hi << 8) | lo;
        Ok(rc)
    }

    fn read_byte(&mut self) -> Ffv1Result<u8> {
        let byte = match self.data.get(self.pos) {
            Some(&b) => b,
            None if self.pos < self.data.len() + MAX_OVERREAD => 0,
            None => return Err(Ffv1Error::InputExhausted),
        };
        self.pos += 1;
        Ok(byte)
    }

    fn refill(&mut self) -> Ffv1Result<()> {
        if self.range < 0x100 {
            self.range <<= 8;
            self.low = (self.low << 8) | self.read_byte()? as u32;
        }
        Ok(())
    }

    /// Decode one binary decision, updating `state` in place.
    #[inline]
    pub fn decode_bit(&mut self, state: &mut u8) -> Ffv1Result<bool> {
        let range1 = (self.range * *state as u32) >> 8;

        self.range -= range1;
        let bit = if self.low < self.range {
            *state = ZERO_STATE[*state as usize];
            false
        } else {
            self.low -= self.range;
            *state = ONE_STATE[*state as usize];
            self.range = range1;
            true
        };

        self.refill()?;
        Ok(bit)
    }

    /// Decode one decision against a throw-away neutral state.
    ///
    /// Used for the per-frame keyframe flag.
    pub fn decode_neutral_bit(&mut self) -> Ffv1Result<bool> {
        let mut state = NEUTRAL_STATE;
        self.decode_bit(&mut state)
    }

    /// Number of input bytes that belong to the range-coded data so far.
    ///
    /// The decoder always holds one byte of look-ahead, which is not counted.
    pub fn bytes_consumed(&self) -> usize {
        self.pos.saturating_sub(1).min(self.data.len())
    }
}

// ── Encoder ──────────────────────────────────────────────────────────

/// Range encoder producing a byte vector. Exact inverse of [`RangeDecoder`].
pub struct RangeEncoder {
    out: Vec<u8>,
    low: u32,
    range: u32,
    /// Byte held back until we know whether a carry reaches it.
    outstanding_byte: Option<u32>,
    /// Run of 0xFF bytes waiting behind `outstanding_byte`.
    outstanding_count: usize,
}

impl RangeEncoder {
    pub fn new() -> Self {
        RangeEncoder {
            out: Vec::new(),
            low: 0,
            range: 0xFF00,
            outstanding_byte: None,
            outstanding_count: 0,
        }
    }

    fn renormalize(&mut self) {
        while self.range < 0x100 {
            match self.outstanding_byte {
                None => self.outstanding_byte = Some(self.low >> 8),
                Some(byte) if self.low <= 0xFF00 => {
                    self.out.push(byte as u8);
                    let n = self.out.len() + self.outstanding_count;
                    self.out.resize(n, 0xFF);
                    self.outstanding_count = 0;
                    self.outstanding_byte = Some(self.low >> 8);
                }
                Some(byte) if self.low >= 0x10000 => {
                    // Carry into the held byte; the 0xFF run rolls over to 0x00.
                    self.out.push((byte + 1) as u8);
                    let n = self.out.len() + self.outstanding_count;
                    self.out.resize(n, 0x00);
                    self.outstanding_count = 0;
                    self.outstanding_byte = Some((self.low >> 8) - 0x100);
                }
                Some(_) => self.outstanding_count += 1,
            }

            self.low = (self.low & 0xFF) << 8;
            self.range <<= 8;
        }
    }

    /// Encode one binary decision, updating `state` in place.
    #[inline]
    pub fn encode_bit(&mut self, state: &mut u8, bit: bool) {
        let range1 = (self.range * *state as u32) >> 8;

        if bit {
            self.low += self.range - range1;
            self.range = range1;
            *state = ONE_STATE[*state as usize];
        } else {
            self.range -= range1;
            *state = ZERO_STATE[*state as usize];
        }

        self.renormalize();
    }

    /// Encode one decision against a throw-away neutral state.
    pub fn encode_neutral_bit(&mut self, bit: bool) {
        let mut state = NEUTRAL_STATE;
        self.encode_bit(&mut state, bit);
    }

    /// Flush the coder and return the finished byte stream.
    pub fn terminate(mut self) -> Vec<u8> {
        self.range = 0xFF;
        self.low += 0xFF;
        self.renormalize();
        self.range = 0xFF;
        self.renormalize();
        self.out
    }
}

impl Default for RangeEncoder {
    fn default() -> Self {
        Self::new()
    }
}
