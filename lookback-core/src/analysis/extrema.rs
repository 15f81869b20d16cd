// lookback-core/src/analysis/extrema.rs

use rust_decimal::Decimal;
use std::ops::Range;

/// Which extreme a [`RangeExtrema`] index answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Max,
    Min,
}

impl Extremum {
    fn pick(self, a: Decimal, b: Decimal) -> Decimal {
        match self {
            Extremum::Max => a.max(b),
            Extremum::Min => a.min(b),
        }
    }
}

/// Sparse table over a price column.
///
/// Built once in O(n log n); answers max/min over any half-open range in O(1),
/// so a sweep over many lookback values never rescans a window.
#[derive(Debug, Clone)]
pub struct RangeExtrema {
    kind: Extremum,
    // levels[k][i] holds the extreme of values[i..i + 2^k]
    levels: Vec<Vec<Decimal>>,
}

impl RangeExtrema {
    pub fn new(values: &[Decimal], kind: Extremum) -> Self {
        let mut levels = vec![values.to_vec()];
        let mut width = 1;

        while width * 2 <= values.len() {
            let prev = &levels[levels.len() - 1];
            let next: Vec<Decimal> = (0..=values.len() - width * 2)
                .map(|i| kind.pick(prev[i], prev[i + width]))
                .collect();
            levels.push(next);
            width *= 2;
        }

        Self { kind, levels }
    }

    pub fn kind(&self) -> Extremum {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    /// Extreme value over `range`, or `None` if the range is empty or out of bounds
    pub fn query(&self, range: Range<usize>) -> Option<Decimal> {
        if range.start >= range.end || range.end > self.len() {
            return None;
        }

        let width = range.end - range.start;
        let level = (usize::BITS - 1 - width.leading_zeros()) as usize;
        let row = &self.levels[level];

        Some(self.kind.pick(row[range.start], row[range.end - (1 << level)]))
    }
}
