//! Row storage for the line decoder.
//!
//! Two padded rows are swapped by index after every line. The row being
//! written still holds the line from two rows up until each sample is
//! overwritten, which is where the `TT` neighbor is read from.

use crate::predictor::Neighbors;

/// Samples of padding on each side of a row.
const PAD: usize = 3;

/// Ping-pong pair of sample rows for one plane.
pub struct RowBuffers {
    rows: [Vec<i32>; 2],
    /// Index of the row being decoded; the other one is the row above.
    current: usize,
    width: usize,
}

impl RowBuffers {
    /// Rows for a plane `width` samples wide (`width > 0`), all zero.
    pub fn new(width: usize) -> Self {
        RowBuffers {
            rows: [vec![0; width + 2 * PAD], vec![0; width + 2 * PAD]],
            current: 1,
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn split(&mut self) -> (&mut [i32], &mut [i32]) {
        let [a, b] = &mut self.rows;
        if self.current == 0 { (a, b) } else { (b, a) }
    }

    /// Start a new line: the finished line becomes the row above and its
    /// edges are replicated into the padding.
    pub fn advance(&mut self) {
        self.current ^= 1;
        let w = self.width;
        let (cur, above) = self.split();
        cur[PAD - 1] = above[PAD];
        above[PAD + w] = above[PAD + w - 1];
    }

    /// Causal neighbors of column `x` on the current line.
    #[inline]
    pub fn neighbors(&self, x: usize) -> Neighbors {
        let cur = &self.rows[self.current];
        let above = &self.rows[self.current ^ 1];
        let i = PAD + x;
        Neighbors {
            l: cur[i - 1],
            lt: above[i - 1],
            t: above[i],
            rt: above[i + 1],
            ll: cur[i - 2],
            tt: cur[i],
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, sample: i32) {
        let i = PAD + x;
        self.rows[self.current][i] = sample;
    }

    /// The samples of the current line.
    pub fn current_row(&self) -> &[i32] {
        &self.rows[self.current][PAD..PAD + self.width]
    }
}
