//! Adaptive Golomb-Rice coding for streams that do not use the range coder.
//!
//! Each context keeps a small running estimator (`VlcState`) of the residual
//! magnitude and sign. The magnitude picks the Rice parameter `k`; the sign
//! estimate (drift) decides whether the code is complemented, and the bias
//! recenters the residual before it is folded back into sample range.

use std::io::Cursor;

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use crate::error::{Ffv1Error, Ffv1Result};

/// Unary prefix length at which a code switches to the escape form.
const ESCAPE_LIMIT: u32 = 12;

/// Largest Rice parameter a valid stream can require.
const MAX_RICE_K: u32 = 8;

/// Run-length exponents, indexed by the current run index.
pub const LOG2_RUN: [u8; 32] = [
    0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, //
    4, 4, 5, 5, 6, 6, 7, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];

/// Wrap `diff` into the signed range of a `bits`-wide sample.
pub fn fold(diff: i32, bits: u32) -> i32 {
    if bits == 8 {
        diff as i8 as i32
    } else {
        let half = 1i32 << (bits - 1);
        (diff.wrapping_add(half) & ((1 << bits) - 1)) - half
    }
}

// ── Per-context state ────────────────────────────────────────────────

/// Adaptive estimator for one Golomb-Rice context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlcState {
    drift: i16,
    error_sum: u16,
    bias: i8,
    count: u8,
}

impl Default for VlcState {
    fn default() -> Self {
        VlcState {
            drift: 0,
            error_sum: 4,
            bias: 0,
            count: 1,
        }
    }
}

impl VlcState {
    pub fn drift(&self) -> i32 {
        self.drift as i32
    }

    pub fn error_sum(&self) -> u32 {
        self.error_sum as u32
    }

    pub fn bias(&self) -> i32 {
        self.bias as i32
    }

    pub fn count(&self) -> u32 {
        self.count as u32
    }

    /// Rice parameter: how many doublings of `count` reach `error_sum`.
    fn rice_parameter(&self) -> Ffv1Result<u32> {
        let mut i = self.count as u32;
        let mut k = 0;
        while i < self.error_sum as u32 {
            k += 1;
            i += i;
        }
        if k > MAX_RICE_K {
            return Err(Ffv1Error::CorruptSymbol("rice parameter exceeds 8"));
        }
        Ok(k)
    }

    /// Complement mask: all ones when the drift says residuals run negative.
    fn sign_mask(&self) -> i32 {
        (2 * self.drift as i32 + self.count as i32) >> 31
    }

    /// Fold one coded value into the estimator.
    fn update(&mut self, v: i32) {
        let mut drift = self.drift as i32;
        let mut count = self.count as i32;
        let mut error_sum = self.error_sum.wrapping_add(v.unsigned_abs() as u16);
        drift += v;

        // Periodic forgetting
        if count == 128 {
            count >>= 1;
            drift >>= 1;
            error_sum >>= 1;
        }
        count += 1;

        if drift <= -count {
            if self.bias > -128 {
                self.bias -= 1;
            }
            drift += count;
            if drift <= -count {
                drift = -count + 1;
            }
        } else if drift > 0 {
            if self.bias < 127 {
                self.bias += 1;
            }
            drift -= count;
            if drift > 0 {
                drift = 0;
            }
        }

        self.drift = drift as i16;
        self.error_sum = error_sum;
        self.count = count as u8;
    }

    /// Decode one residual for a `bits`-wide sample.
    pub fn decode(&mut self, reader: &mut GolombReader<'_>, bits: u32) -> Ffv1Result<i32> {
        let k = self.rice_parameter()?;
        let mut v = reader.read_sr_golomb(k, bits)?;

        v ^= self.sign_mask();
        let ret = fold(v + self.bias as i32, bits);

        self.update(v);
        Ok(ret)
    }

    /// Encode one residual for a `bits`-wide sample. Exact inverse of
    /// [`VlcState::decode`].
    pub fn encode(&mut self, writer: &mut GolombWriter, v: i32, bits: u32) -> Ffv1Result<()> {
        let v = fold(v - self.bias as i32, bits);
        let k = self.rice_parameter()?;

        let code = v ^ self.sign_mask();
        writer.write_sr_golomb(code, k, bits)?;

        self.update(v);
        Ok(())
    }
}

// ── Bit reader ───────────────────────────────────────────────────────

/// MSB-first bit reader for the Golomb-Rice section of a frame.
pub struct GolombReader<'a> {
    reader: BitReader<Cursor<&'a [u8]>, BigEndian>,
    bits_read: u64,
}

impl<'a> GolombReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        GolombReader {
            reader: BitReader::endian(Cursor::new(data), BigEndian),
            bits_read: 0,
        }
    }

    pub fn read_bit(&mut self) -> Ffv1Result<bool> {
        let bit = self.reader.read_bit()?;
        self.bits_read += 1;
        Ok(bit)
    }

    /// Read an unsigned `n`-bit value (`n <= 32`).
    pub fn read_bits(&mut self, n: u32) -> Ffv1Result<u32> {
        if n == 0 {
            return Ok(0);
        }
        let value = self.reader.read::<u32>(n)?;
        self.bits_read += n as u64;
        Ok(value)
    }

    /// Unsigned Rice code with parameter `k`; after 12 zero bits the value is
    /// sent verbatim in `esc_len` bits instead.
    pub fn read_ur_golomb(&mut self, k: u32, esc_len: u32) -> Ffv1Result<u32> {
        let mut prefix = 0;
        while prefix < ESCAPE_LIMIT && !self.read_bit()? {
            prefix += 1;
        }

        if prefix < ESCAPE_LIMIT {
            Ok((prefix << k) + self.read_bits(k)?)
        } else {
            Ok(self.read_bits(esc_len)? + ESCAPE_LIMIT - 1)
        }
    }

    /// Signed Rice code: 0, -1, 1, -2, 2, ... map to 0, 1, 2, 3, 4, ...
    pub fn read_sr_golomb(&mut self, k: u32, esc_len: u32) -> Ffv1Result<i32> {
        let u = self.read_ur_golomb(k, esc_len)? as i32;
        if u & 1 == 1 {
            Ok(-(u >> 1) - 1)
        } else {
            Ok(u >> 1)
        }
    }

    /// Bytes touched so far, counting a partial trailing byte.
    pub fn bytes_consumed(&self) -> usize {
        self.bits_read.div_ceil(8) as usize
    }
}

// ── Bit writer ───────────────────────────────────────────────────────

/// MSB-first bit writer, the inverse of [`GolombReader`].
pub struct GolombWriter {
    writer: BitWriter<Vec<u8>, BigEndian>,
}

fn write_failed(e: std::io::Error) -> Ffv1Error {
    Ffv1Error::BufferAllocationFailed(e.to_string())
}

impl GolombWriter {
    pub fn new() -> Self {
        GolombWriter {
            writer: BitWriter::endian(Vec::new(), BigEndian),
        }
    }

    pub fn write_bit(&mut self, bit: bool) -> Ffv1Result<()> {
        self.writer.write_bit(bit).map_err(write_failed)
    }

    /// Write the low `n` bits of `value`, most significant first.
    pub fn write_bits(&mut self, n: u32, value: u32) -> Ffv1Result<()> {
        if n == 0 {
            return Ok(());
        }
        self.writer.write(n, value).map_err(write_failed)
    }

    pub fn write_ur_golomb(&mut self, i: u32, k: u32, esc_len: u32) -> Ffv1Result<()> {
        let e = i >> k;
        if e < ESCAPE_LIMIT {
            self.write_bits(e + k + 1, (1 << k) + (i & ((1 << k) - 1)))
        } else {
            self.write_bits(ESCAPE_LIMIT + esc_len, i - ESCAPE_LIMIT + 1)
        }
    }

    pub fn write_sr_golomb(&mut self, i: i32, k: u32, esc_len: u32) -> Ffv1Result<()> {
        let mut v = -2 * i - 1;
        v ^= v >> 31;
        self.write_ur_golomb(v as u32, k, esc_len)
    }

    /// Pad to a byte boundary with zero bits and return the bytes.
    pub fn finish(mut self) -> Ffv1Result<Vec<u8>> {
        self.writer.byte_align().map_err(write_failed)?;
        Ok(self.writer.into_writer())
    }
}

impl Default for GolombWriter {
    fn default() -> Self {
        Self::new()
    }
}
