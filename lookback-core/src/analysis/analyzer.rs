// lookback-core/src/analysis/analyzer.rs

use lookback_common::{OrderType, PriceBar, TradeEvent, TradePair};
use rust_decimal::Decimal;
use tracing::debug;

use super::errors::AnalysisError;
use super::extrema::{Extremum, RangeExtrema};
use super::types::{AnalysisConfig, LookbackResult, TradeOutcome};

/// Computes lookback-dependent trade outcomes over one price series.
///
/// The high/low range indexes are built once on construction, so the same
/// analyzer can be reused for every value of a sweep and shared across threads.
pub struct LookbackAnalyzer<'a> {
    bars: &'a [PriceBar],
    highs: RangeExtrema,
    lows: RangeExtrema,
    config: AnalysisConfig,
}

impl<'a> LookbackAnalyzer<'a> {
    pub fn new(bars: &'a [PriceBar], config: AnalysisConfig) -> Self {
        let highs: Vec<Decimal> = bars.iter().map(|bar| bar.high).collect();
        let lows: Vec<Decimal> = bars.iter().map(|bar| bar.low).collect();

        Self {
            bars,
            highs: RangeExtrema::new(&highs, Extremum::Max),
            lows: RangeExtrema::new(&lows, Extremum::Min),
            config,
        }
    }

    pub fn bars(&self) -> &[PriceBar] {
        self.bars
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze an alternating entry/exit event list for a single lookback value
    pub fn analyze(
        &self,
        trades: &[TradeEvent],
        lookback: usize,
    ) -> Result<LookbackResult, AnalysisError> {
        let pairs = TradePair::from_events(trades)?;
        self.analyze_pairs(&pairs, lookback)
    }

    /// Analyze already paired trades for a single lookback value
    pub fn analyze_pairs(
        &self,
        pairs: &[TradePair],
        lookback: usize,
    ) -> Result<LookbackResult, AnalysisError> {
        let mut trades = Vec::with_capacity(pairs.len());

        for pair in pairs {
            trades.push(self.evaluate(pair, lookback)?);
        }

        let total_profit = trades
            .iter()
            .try_fold(Decimal::ZERO, |total, t| total.checked_add(t.profit))
            .ok_or(AnalysisError::Overflow {
                lookback,
                entry_index: pairs.last().map_or(0, |p| p.entry_index),
            })?;
        debug!(
            "Lookback {}: {} trades, total profit {}",
            lookback,
            trades.len(),
            total_profit
        );

        Ok(LookbackResult {
            lookback,
            trades,
            total_profit,
        })
    }

    fn evaluate(&self, pair: &TradePair, lookback: usize) -> Result<TradeOutcome, AnalysisError> {
        let entry = pair.entry_index;
        let exit = pair.exit_index;

        if lookback == 0 || entry < lookback {
            return Err(AnalysisError::InvalidLookback {
                lookback,
                entry_index: entry,
            });
        }
        if exit >= self.bars.len() {
            return Err(AnalysisError::RowOutOfRange {
                row: exit,
                bars: self.bars.len(),
            });
        }

        // Union of the sliding windows [entry - lookback + k, entry + k) for k in 1..=exit - entry
        let window = entry + 1 - lookback..exit;
        let held = entry..exit + 1;
        let out_of_range = || AnalysisError::RowOutOfRange {
            row: exit,
            bars: self.bars.len(),
        };

        let overflow = || AnalysisError::Overflow {
            lookback,
            entry_index: entry,
        };
        let tick = self.config.tick_offset;

        let (optimal_price, is_second_order, drawdown_price) = match pair.order_type {
            OrderType::Long => {
                let optimal = self
                    .highs
                    .query(window)
                    .ok_or_else(out_of_range)?
                    .checked_add(tick)
                    .ok_or_else(overflow)?;
                let reached = self.highs.query(held.clone()).ok_or_else(out_of_range)? >= optimal;
                let worst = self.lows.query(held).ok_or_else(out_of_range)?;
                (optimal, reached, worst)
            }
            OrderType::Short => {
                let optimal = self
                    .lows
                    .query(window)
                    .ok_or_else(out_of_range)?
                    .checked_sub(tick)
                    .ok_or_else(overflow)?;
                let reached = self.lows.query(held.clone()).ok_or_else(out_of_range)? <= optimal;
                let worst = self.highs.query(held).ok_or_else(out_of_range)?;
                (optimal, reached, worst)
            }
        };

        // Second order averages the entry with the optimal price
        let fill_price = if is_second_order {
            pair.entry_price
                .checked_add(optimal_price)
                .and_then(|sum| sum.checked_div(Decimal::TWO))
                .ok_or_else(overflow)?
        } else {
            pair.entry_price
        };
        let mut profit = pair.exit_price.checked_sub(fill_price).ok_or_else(overflow)?;
        if pair.order_type == OrderType::Short {
            profit = -profit;
        }

        let drawdown = pair
            .entry_price
            .checked_sub(drawdown_price)
            .ok_or_else(overflow)?
            .abs();
        // Unavailable when there is no adverse excursion or the ratio leaves the Decimal range
        let profit_factor = if drawdown.is_zero() {
            None
        } else {
            profit.checked_div(drawdown)
        };

        Ok(TradeOutcome {
            lookback,
            entry_index: entry,
            entry_time: pair.entry_time.clone(),
            exit_index: exit,
            exit_time: pair.exit_time.clone(),
            order_type: pair.order_type,
            entry_price: pair.entry_price,
            exit_price: pair.exit_price,
            optimal_price,
            drawdown_price,
            is_second_order,
            profit,
            drawdown,
            profit_factor,
        })
    }
}

/// Analyze `trades` over `bars` for one lookback value with the default configuration
pub fn analyze(
    bars: &[PriceBar],
    trades: &[TradeEvent],
    lookback: usize,
) -> Result<LookbackResult, AnalysisError> {
    LookbackAnalyzer::new(bars, AnalysisConfig::default()).analyze(trades, lookback)
}
