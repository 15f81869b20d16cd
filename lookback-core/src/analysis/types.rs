// lookback-core/src/analysis/types.rs

use lookback_common::OrderType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::AnalysisError;

/// Default price improvement added to (Long) or subtracted from (Short) the window extreme
pub const DEFAULT_TICK_OFFSET: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

// Analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub tick_offset: Decimal,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tick_offset: DEFAULT_TICK_OFFSET,
        }
    }
}

/// Inclusive range of lookback values stepped by `interval`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookbackRange {
    pub min: usize,
    pub max: usize,
    pub interval: usize,
}

impl Default for LookbackRange {
    fn default() -> Self {
        Self {
            min: 150,
            max: 350,
            interval: 20,
        }
    }
}

impl LookbackRange {
    pub fn new(min: usize, max: usize, interval: usize) -> Result<Self, AnalysisError> {
        let range = Self { min, max, interval };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.min == 0 || self.max == 0 || self.interval == 0 {
            return Err(AnalysisError::InvalidRange(format!(
                "min, max and interval must be positive (got {}, {}, {})",
                self.min, self.max, self.interval
            )));
        }
        if self.min > self.max {
            return Err(AnalysisError::InvalidRange(format!(
                "min {} is greater than max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Expand to `min, min + interval, ...` up to and including `max`
    pub fn values(&self) -> Result<Vec<usize>, AnalysisError> {
        self.validate()?;
        Ok((self.min..=self.max).step_by(self.interval).collect())
    }
}

/// Per-trade detail row for one lookback value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub lookback: usize,
    pub entry_index: usize,
    pub entry_time: String,
    pub exit_index: usize,
    pub exit_time: String,
    pub order_type: OrderType,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub optimal_price: Decimal,
    pub drawdown_price: Decimal,
    pub is_second_order: bool,
    pub profit: Decimal,
    /// Adverse excursion between entry and exit, never negative
    pub drawdown: Decimal,
    /// `profit / drawdown`; unavailable when the trade never moved against the entry
    pub profit_factor: Option<Decimal>,
}

/// All trade outcomes for a single lookback value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookbackResult {
    pub lookback: usize,
    pub trades: Vec<TradeOutcome>,
    pub total_profit: Decimal,
}

/// Aggregate statistics for one lookback value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookbackStats {
    pub lookback: usize,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub second_order_trades: u32,
    /// Percentage of trades with positive profit
    pub win_rate: Decimal,
    pub total_profit: Decimal,
    pub avg_profit_per_trade: Decimal,
    pub largest_winning_trade: Decimal,
    pub largest_losing_trade: Decimal,
    pub max_drawdown: Decimal,
    /// Gross profit over gross loss; unavailable when no trade lost
    pub profit_factor: Option<Decimal>,
}

/// Progress notification emitted after each lookback value of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepProgress {
    pub completed: usize,
    pub total: usize,
    pub lookback: usize,
}

impl SweepProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Headline numbers of a whole sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub best_lookback: usize,
    pub best_total_profit: Decimal,
    pub worst_lookback: usize,
    pub worst_total_profit: Decimal,
    /// `(max / min - 1) * 100` over total profits; unavailable when the minimum is zero
    pub spread: Option<Decimal>,
}
