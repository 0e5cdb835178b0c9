//! Spatial prediction and context modeling.
//!
//! Every sample is predicted from its causal neighbors with the median
//! (MED) predictor; the residual is coded under a context chosen from the
//! quantized gradients around the sample:
//!
//! ```text
//!        TT
//!    LT  T  RT
//! LL L   X
//! ```
//!
//! Context sums may be negative. The coder folds them onto their magnitude
//! and flips the residual sign instead, halving the number of contexts.

// ── Standard quantizers ──────────────────────────────────────────────
//
// Odd step functions over a signed byte difference (index = diff & 0xFF).
// Streams carry their own tables; these are the ones encoders use.

/// 3-level quantizer.
#[rustfmt::skip]
pub const QUANT3: [i8; 256] = [
     0,  0,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,
     1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,
     1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,
     1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,
     1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,
     1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,
     1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,
     1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1,  0,
];

/// 5-level quantizer.
#[rustfmt::skip]
pub const QUANT5: [i8; 256] = [
     0,  1,  1,  1,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,
     2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,
     2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,
     2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,
     2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,
     2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,
     2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,
     2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,
    -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2,
    -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2,
    -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2,
    -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2,
    -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2,
    -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2,
    -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2,
    -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -1, -1, -1,
];

/// 7-level quantizer.
#[rustfmt::skip]
pub const QUANT7: [i8; 256] = [
     0,  1,  1,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,
     2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,  2,
     2,  2,  2,  2,  2,  2,  2,  2,  3,  3,  3,  3,  3,  3,  3,  3,
     3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,
     3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,
     3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,
     3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,
     3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,
    -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3,
    -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3,
    -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3,
    -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3,
    -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -3,
    -3, -3, -3, -3, -3, -3, -3, -3, -3, -2, -2, -2, -2, -2, -2, -2,
    -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2,
    -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -2, -1, -1,
];

/// 9-level quantizer.
#[rustfmt::skip]
pub const QUANT9: [i8; 256] = [
     0,  1,  1,  2,  2,  2,  2,  3,  3,  3,  3,  3,  3,  3,  3,  3,
     3,  3,  3,  3,  3,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,
     4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,
     4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,
     4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,
     4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,
     4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,
     4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -3, -3, -3, -3,
    -3, -3, -3, -3, -3, -3, -3, -3, -3, -3, -2, -2, -2, -2, -1, -1,
];

/// 11-level quantizer.
#[rustfmt::skip]
pub const QUANT11: [i8; 256] = [
     0,  1,  2,  2,  2,  3,  3,  3,  3,  3,  3,  3,  4,  4,  4,  4,
     4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,  4,
     4,  4,  4,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,
     5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,
     5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,
     5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,
     5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,
     5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,
    -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5,
    -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5,
    -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5,
    -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5,
    -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5,
    -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -4, -4,
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,
    -4, -4, -4, -4, -4, -3, -3, -3, -3, -3, -3, -3, -2, -2, -2, -1,
];

/// 13-level quantizer.
#[rustfmt::skip]
pub const QUANT13: [i8; 256] = [
     0,  1,  2,  2,  3,  3,  3,  3,  4,  4,  4,  4,  4,  4,  4,  4,
     4,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,
     5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,
     5,  5,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,
     6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,
     6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,
     6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,
     6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,  6,
    -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6,
    -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6,
    -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6,
    -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6,
    -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -6, -5,
    -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5,
    -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5, -5,
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -3, -3, -3, -3, -2, -2, -1,
];
// ── Quantization tables ──────────────────────────────────────────────

/// Number of quantization tables per stream.
pub const QUANT_TABLE_COUNT: usize = 5;

/// One quantization table: signed byte difference → context contribution.
pub type QuantTable = [i32; 256];

/// Choice of standard table set for encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextModel {
    /// Three gradients, 11 levels each (666 contexts).
    Small,
    /// Three 11/11/5-level gradients plus two 5-level long-range ones
    /// (7563 contexts).
    Large,
}

/// The five quantization tables of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantTables {
    tables: [QuantTable; QUANT_TABLE_COUNT],
    five_neighbors: bool,
}

impl QuantTables {
    pub fn new(tables: [QuantTable; QUANT_TABLE_COUNT]) -> Self {
        // Either long-range table being non-flat switches to five neighbors.
        let five_neighbors = tables[3][127] != 0 || tables[4][127] != 0;
        QuantTables {
            tables,
            five_neighbors,
        }
    }

    /// The standard table set for `model`.
    pub fn standard(model: ContextModel) -> Self {
        let mut tables = [[0i32; 256]; QUANT_TABLE_COUNT];
        for i in 0..256 {
            tables[0][i] = QUANT11[i] as i32;
            tables[1][i] = 11 * QUANT11[i] as i32;
            match model {
                ContextModel::Small => {
                    tables[2][i] = 11 * 11 * QUANT11[i] as i32;
                }
                ContextModel::Large => {
                    tables[2][i] = 11 * 11 * QUANT5[i] as i32;
                    tables[3][i] = 5 * 11 * 11 * QUANT5[i] as i32;
                    tables[4][i] = 5 * 5 * 11 * 11 * QUANT5[i] as i32;
                }
            }
        }
        QuantTables::new(tables)
    }

    pub fn tables(&self) -> &[QuantTable; QUANT_TABLE_COUNT] {
        &self.tables
    }

    /// Whether contexts include the `LL` and `TT` gradients.
    pub fn uses_five_neighbors(&self) -> bool {
        self.five_neighbors
    }

    /// Number of distinct steps in the non-negative half of table `i`.
    pub fn steps(&self, i: usize) -> usize {
        let half = &self.tables[i][..128];
        1 + half.windows(2).filter(|w| w[0] != w[1]).count()
    }

    /// Number of contexts the tables can address: half the product of the
    /// per-table level counts, rounded up.
    pub fn context_count(&self) -> usize {
        let product: usize = (0..QUANT_TABLE_COUNT).map(|i| 2 * self.steps(i) - 1).product();
        product.div_ceil(2)
    }

    /// Signed context sum for one sample.
    #[inline]
    pub fn context(&self, n: &Neighbors) -> i32 {
        let q = &self.tables;
        let mut sum = q[0][((n.l - n.lt) & 0xFF) as usize]
            + q[1][((n.lt - n.t) & 0xFF) as usize]
            + q[2][((n.t - n.rt) & 0xFF) as usize];
        if self.five_neighbors {
            sum += q[3][((n.ll - n.l) & 0xFF) as usize] + q[4][((n.tt - n.t) & 0xFF) as usize];
        }
        sum
    }

    /// Context index and whether the residual sign is flipped.
    #[inline]
    pub fn context_index(&self, n: &Neighbors) -> (usize, bool) {
        let sum = self.context(n);
        (sum.unsigned_abs() as usize, sum < 0)
    }
}

// ── Prediction ───────────────────────────────────────────────────────

/// Causal neighborhood of the sample being coded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighbors {
    /// Left.
    pub l: i32,
    /// Top-left.
    pub lt: i32,
    /// Top.
    pub t: i32,
    /// Top-right.
    pub rt: i32,
    /// Two to the left.
    pub ll: i32,
    /// Two rows up.
    pub tt: i32,
}

impl Neighbors {
    /// MED prediction for this neighborhood.
    #[inline]
    pub fn predict(&self) -> i32 {
        median_predict(self.l, self.t, self.lt)
    }
}

/// Median of `left`, `top` and the planar gradient `left + top - top_left`.
#[inline]
pub fn median_predict(left: i32, top: i32, top_left: i32) -> i32 {
    median3(left, left + top - top_left, top)
}

#[inline]
fn median3(a: i32, b: i32, c: i32) -> i32 {
    a.min(b).max(a.max(b).min(c))
}

/// Rebuild a sample from its prediction and residual, modulo `2^bits`.
#[inline]
pub fn reconstruct(predicted: i32, residual: i32, bits: u32) -> i32 {
    predicted.wrapping_add(residual) & ((1 << bits) - 1)
}
