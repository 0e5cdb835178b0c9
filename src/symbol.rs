//! Integer symbols over adaptive binary decisions.
//!
//! A non-zero value `v` with `a = |v|` and `e = floor(log2(a))` is sent as:
//!
//! | position | decision |
//! |----------|----------|
//! | 0        | is-zero flag |
//! | 1..=10   | exponent `e` in unary, terminated by a `0` |
//! | 22..=30  | the `e` low bits of `a`, most significant first |
//! | 11 + e   | sign (signed symbols only) |
//!
//! Each position has its own probability state inside a [`SymbolState`].

use crate::error::{Ffv1Error, Ffv1Result};
use crate::range_coder::{NEUTRAL_STATE, RangeDecoder, RangeEncoder};

/// Number of adaptive states per symbol context.
pub const CONTEXT_SIZE: usize = 32;

/// Largest exponent a symbol may carry (|v| < 1024).
pub const MAX_EXPONENT: usize = 9;

/// The probability states for one symbol context.
pub type SymbolState = [u8; CONTEXT_SIZE];

/// A symbol context with every position at the neutral probability.
pub const NEUTRAL_SYMBOL_STATE: SymbolState = [NEUTRAL_STATE; CONTEXT_SIZE];

/// Decode one symbol.
pub fn get_symbol(
    rc: &mut RangeDecoder<'_>,
    state: &mut SymbolState,
    signed: bool,
) -> Ffv1Result<i32> {
    if rc.decode_bit(&mut state[0])? {
        return Ok(0);
    }

    let mut e = 0usize;
    while rc.decode_bit(&mut state[1 + e])? {
        e += 1;
        if e > MAX_EXPONENT {
            return Err(Ffv1Error::CorruptSymbol("symbol exponent exceeds 9"));
        }
    }

    let mut a: i32 = 1;
    for i in (0..e).rev() {
        a += a + rc.decode_bit(&mut state[22 + i])? as i32;
    }

    if signed && rc.decode_bit(&mut state[11 + e])? {
        Ok(-a)
    } else {
        Ok(a)
    }
}

/// Encode one symbol.
///
/// Values with `|v| >= 1024`, or negative values for an unsigned symbol,
/// are rejected before anything is written.
pub fn put_symbol(
    rc: &mut RangeEncoder,
    state: &mut SymbolState,
    v: i32,
    signed: bool,
) -> Ffv1Result<()> {
    if v == 0 {
        rc.encode_bit(&mut state[0], true);
        return Ok(());
    }

    let a = v.unsigned_abs();
    let e = a.ilog2() as usize;
    if e > MAX_EXPONENT || (v < 0 && !signed) {
        return Err(Ffv1Error::CorruptSymbol("symbol out of encodable range"));
    }

    rc.encode_bit(&mut state[0], false);
    for i in 0..e {
        rc.encode_bit(&mut state[1 + i], true);
    }
    rc.encode_bit(&mut state[1 + e], false);

    for i in (0..e).rev() {
        rc.encode_bit(&mut state[22 + i], (a >> i) & 1 != 0);
    }

    if signed {
        rc.encode_bit(&mut state[11 + e], v < 0);
    }
    Ok(())
}
