//! Lookback sweeps.
//!
//! Runs the analyzer once per lookback value and reduces the results to a
//! profit curve, a max/min spread and a summary. The parallel variant spreads
//! lookback values over the rayon pool; each value is independent.

use std::ops::ControlFlow;

use lookback_common::{PriceBar, TradeEvent, TradePair};
use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::analyzer::LookbackAnalyzer;
use super::errors::AnalysisError;
use super::types::{AnalysisConfig, LookbackResult, SweepProgress, SweepSummary};

impl<'a> LookbackAnalyzer<'a> {
    /// One result per lookback value, in input order.
    ///
    /// The first invalid lookback aborts the sweep; no partial results are returned.
    pub fn sweep(
        &self,
        trades: &[TradeEvent],
        lookbacks: &[usize],
    ) -> Result<Vec<LookbackResult>, AnalysisError> {
        self.sweep_with_progress(trades, lookbacks, |_| ControlFlow::Continue(()))
    }

    /// Sequential sweep reporting progress after each lookback value.
    ///
    /// Returning `ControlFlow::Break` from `on_progress` cancels the sweep.
    pub fn sweep_with_progress<F>(
        &self,
        trades: &[TradeEvent],
        lookbacks: &[usize],
        mut on_progress: F,
    ) -> Result<Vec<LookbackResult>, AnalysisError>
    where
        F: FnMut(SweepProgress) -> ControlFlow<()>,
    {
        let pairs = TradePair::from_events(trades)?;
        let total = lookbacks.len();
        info!(
            "Starting lookback sweep: {} values over {} trades",
            total,
            pairs.len()
        );

        let mut results = Vec::with_capacity(total);

        for (i, &lookback) in lookbacks.iter().enumerate() {
            results.push(self.analyze_pairs(&pairs, lookback)?);

            let progress = SweepProgress {
                completed: i + 1,
                total,
                lookback,
            };
            if on_progress(progress).is_break() && progress.completed < total {
                info!("Lookback sweep cancelled at lookback {}", lookback);
                return Err(AnalysisError::Cancelled {
                    completed: progress.completed,
                    total,
                });
            }
        }

        info!("Lookback sweep completed");
        Ok(results)
    }

    /// Same contract as [`LookbackAnalyzer::sweep`], evaluated on the rayon pool
    pub fn par_sweep(
        &self,
        trades: &[TradeEvent],
        lookbacks: &[usize],
    ) -> Result<Vec<LookbackResult>, AnalysisError> {
        let pairs = TradePair::from_events(trades)?;
        info!(
            "Starting parallel lookback sweep: {} values over {} trades",
            lookbacks.len(),
            pairs.len()
        );

        let results = lookbacks
            .par_iter()
            .map(|&lookback| self.analyze_pairs(&pairs, lookback))
            .collect::<Result<Vec<_>, _>>()?;

        info!("Parallel lookback sweep completed");
        Ok(results)
    }
}

/// Sweep `trades` over `bars` with the default configuration
pub fn sweep(
    bars: &[PriceBar],
    trades: &[TradeEvent],
    lookbacks: &[usize],
) -> Result<Vec<LookbackResult>, AnalysisError> {
    LookbackAnalyzer::new(bars, AnalysisConfig::default()).sweep(trades, lookbacks)
}

/// Scalar projection of a sweep: `(lookback, total profit)` per value
pub fn profit_curve(results: &[LookbackResult]) -> Vec<(usize, Decimal)> {
    results
        .iter()
        .map(|r| (r.lookback, r.total_profit))
        .collect()
}

/// `(max / min - 1) * 100` over the total profits of a sweep
pub fn percentage_spread(results: &[LookbackResult]) -> Result<Decimal, AnalysisError> {
    let max = results.iter().map(|r| r.total_profit).max();
    let min = results.iter().map(|r| r.total_profit).min();

    let (max, min) = match (max, min) {
        (Some(max), Some(min)) => (max, min),
        _ => {
            return Err(AnalysisError::DegenerateSweep(
                "sweep produced no results".to_string(),
            ))
        }
    };

    if min.is_zero() {
        return Err(AnalysisError::DegenerateSweep(
            "minimum total profit is zero".to_string(),
        ));
    }

    max.checked_div(min)
        .and_then(|ratio| ratio.checked_sub(Decimal::ONE))
        .and_then(|excess| excess.checked_mul(Decimal::from(100)))
        .ok_or_else(|| {
            AnalysisError::DegenerateSweep(format!("spread of {} over {} overflows", max, min))
        })
}

/// Best and worst lookback by total profit, plus the spread when it is defined.
///
/// Ties resolve to the earliest lookback in sweep order.
pub fn summarize(results: &[LookbackResult]) -> Option<SweepSummary> {
    let first = results.first()?;
    let (mut best, mut worst) = (first, first);

    for result in &results[1..] {
        if result.total_profit > best.total_profit {
            best = result;
        }
        if result.total_profit < worst.total_profit {
            worst = result;
        }
    }

    let spread = match percentage_spread(results) {
        Ok(spread) => Some(spread),
        Err(e) => {
            debug!("Spread unavailable: {}", e);
            None
        }
    };

    Some(SweepSummary {
        best_lookback: best.lookback,
        best_total_profit: best.total_profit,
        worst_lookback: worst.lookback,
        worst_total_profit: worst.total_profit,
        spread,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookback_common::OrderType;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    /// Rising series with a dip, long 12 -> 18 and short 25 -> 28
    fn fixture() -> (Vec<PriceBar>, Vec<TradeEvent>) {
        let highs = [
            10, 14, 11, 12, 13, 9, 12, 13, 14, 12, 15, 17, 16, 18, 19, 17, 20, 22, 21, 23, 24,
            22, 21, 20, 23, 25, 24, 21, 22, 20,
        ];
        let bars = highs
            .iter()
            .enumerate()
            .map(|(i, &h)| {
                let h = Decimal::from(h);
                PriceBar::new(format!("t{}", i), h - Decimal::ONE, h, h - Decimal::TWO, h)
            })
            .collect();

        let trades = vec![
            TradeEvent::entry(12, "t12", OrderType::Long, d("15.5")),
            TradeEvent::exit(18, "t18", d("20.5")),
            TradeEvent::entry(25, "t25", OrderType::Short, d("24.5")),
            TradeEvent::exit(28, "t28", d("21.5")),
        ];
        (bars, trades)
    }

    fn result(lookback: usize, total: &str) -> LookbackResult {
        LookbackResult {
            lookback,
            trades: vec![],
            total_profit: d(total),
        }
    }

    #[test]
    fn test_sweep_is_ordered_and_deterministic() {
        let (bars, trades) = fixture();
        let lookbacks = [8, 2, 5, 12];

        let first = sweep(&bars, &trades, &lookbacks).unwrap();
        let second = sweep(&bars, &trades, &lookbacks).unwrap();

        assert_eq!(first, second);
        let order: Vec<usize> = first.iter().map(|r| r.lookback).collect();
        assert_eq!(order, lookbacks.to_vec());
        for r in &first {
            assert_eq!(r.trades.len(), 2);
            assert_eq!(
                r.total_profit,
                r.trades.iter().map(|t| t.profit).sum::<Decimal>()
            );
            assert!(r.trades.iter().all(|t| t.lookback == r.lookback));
        }
    }

    #[test]
    fn test_parallel_sweep_matches_sequential() {
        let (bars, trades) = fixture();
        let lookbacks: Vec<usize> = (1..=12).collect();
        let analyzer = LookbackAnalyzer::new(&bars, AnalysisConfig::default());

        let sequential = analyzer.sweep(&trades, &lookbacks).unwrap();
        let parallel = analyzer.par_sweep(&trades, &lookbacks).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_sweep_aborts_on_invalid_lookback() {
        let (bars, trades) = fixture();
        let analyzer = LookbackAnalyzer::new(&bars, AnalysisConfig::default());

        // entry at row 12 cannot look back 13 bars
        let err = analyzer.sweep(&trades, &[4, 13]).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InvalidLookback {
                lookback: 13,
                entry_index: 12
            }
        ));
        assert!(analyzer.par_sweep(&trades, &[4, 13]).is_err());
    }

    #[test]
    fn test_progress_and_cancellation() {
        let (bars, trades) = fixture();
        let analyzer = LookbackAnalyzer::new(&bars, AnalysisConfig::default());

        let mut seen = Vec::new();
        let results = analyzer
            .sweep_with_progress(&trades, &[2, 4, 6], |p| {
                seen.push((p.completed, p.total, p.lookback));
                ControlFlow::Continue(())
            })
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(seen, vec![(1, 3, 2), (2, 3, 4), (3, 3, 6)]);

        let err = analyzer
            .sweep_with_progress(&trades, &[2, 4, 6], |p| {
                if p.completed == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Cancelled {
                completed: 2,
                total: 3
            }
        ));
    }

    #[test]
    fn test_wide_lookback_is_idempotent_without_new_extremes() {
        // Prefix the series with bars whose highs sit below every high the long
        // trade already sees, so widening the window over them changes nothing.
        let (bars, trades) = fixture();
        let padding: Vec<PriceBar> = (0..10)
            .map(|i| PriceBar::new(format!("p{}", i), d("15"), d("15"), d("15"), d("15")))
            .collect();
        let long_leg: Vec<TradeEvent> = trades[..2]
            .iter()
            .map(|e| TradeEvent {
                row_index: e.row_index + padding.len(),
                ..e.clone()
            })
            .collect();
        let mut padded = padding;
        padded.extend(bars);

        let analyzer = LookbackAnalyzer::new(&padded, AnalysisConfig::default());
        // entry now sits at row 22; lookback 13 reaches the first unpadded bar
        let covered = analyzer.analyze(&long_leg, 13).unwrap();

        for lookback in 14..=22 {
            let widened = analyzer.analyze(&long_leg, lookback).unwrap();
            assert_eq!(
                widened.trades[0].optimal_price,
                covered.trades[0].optimal_price
            );
            assert_eq!(widened.total_profit, covered.total_profit);
        }
    }

    #[test]
    fn test_percentage_spread() {
        let results = vec![result(10, "50"), result(20, "80"), result(30, "40")];
        assert_eq!(percentage_spread(&results).unwrap(), d("100"));
        assert_eq!(
            profit_curve(&results),
            vec![(10, d("50")), (20, d("80")), (30, d("40"))]
        );
    }

    #[test]
    fn test_percentage_spread_degenerate() {
        let zeros = vec![result(10, "0"), result(20, "0")];
        assert!(matches!(
            percentage_spread(&zeros),
            Err(AnalysisError::DegenerateSweep(_))
        ));
        assert!(matches!(
            percentage_spread(&[]),
            Err(AnalysisError::DegenerateSweep(_))
        ));
    }

    #[test]
    fn test_percentage_spread_overflow_is_degenerate() {
        // ratio fits a Decimal but scaling it to a percentage does not
        let results = vec![result(10, "10000000000"), result(20, "0.00000000000000001")];
        assert!(matches!(
            percentage_spread(&results),
            Err(AnalysisError::DegenerateSweep(_))
        ));

        let summary = summarize(&results).unwrap();
        assert_eq!(summary.best_lookback, 10);
        assert_eq!(summary.worst_lookback, 20);
        assert_eq!(summary.spread, None);
    }

    #[test]
    fn test_summary() {
        let results = vec![result(10, "50"), result(20, "80"), result(30, "40"), result(40, "80")];
        let summary = summarize(&results).unwrap();

        assert_eq!(summary.best_lookback, 20);
        assert_eq!(summary.best_total_profit, d("80"));
        assert_eq!(summary.worst_lookback, 30);
        assert_eq!(summary.spread, Some(d("100")));

        let zeros = vec![result(10, "0"), result(20, "0")];
        assert_eq!(summarize(&zeros).unwrap().spread, None);
        assert!(summarize(&[]).is_none());
    }
}
