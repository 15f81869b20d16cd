// lookback-core/src/analysis/metrics.rs

use rust_decimal::Decimal;

use super::types::{LookbackResult, LookbackStats, TradeOutcome};

pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(&self, result: &LookbackResult) -> LookbackStats {
        let trades = &result.trades;
        let (winners, losers) = self.split_trades(trades);

        LookbackStats {
            lookback: result.lookback,
            total_trades: trades.len() as u32,
            winning_trades: winners.len() as u32,
            losing_trades: losers.len() as u32,
            second_order_trades: trades.iter().filter(|t| t.is_second_order).count() as u32,
            win_rate: self.calculate_win_rate(winners.len(), trades.len()),
            total_profit: result.total_profit,
            avg_profit_per_trade: self.calculate_avg_profit(result),
            largest_winning_trade: winners
                .iter()
                .map(|t| t.profit)
                .max()
                .unwrap_or(Decimal::ZERO),
            largest_losing_trade: losers
                .iter()
                .map(|t| t.profit)
                .min()
                .unwrap_or(Decimal::ZERO),
            max_drawdown: trades
                .iter()
                .map(|t| t.drawdown)
                .max()
                .unwrap_or(Decimal::ZERO),
            profit_factor: self.calculate_profit_factor(&winners, &losers),
        }
    }

    // Break-even trades count as neither
    fn split_trades<'t>(
        &self,
        trades: &'t [TradeOutcome],
    ) -> (Vec<&'t TradeOutcome>, Vec<&'t TradeOutcome>) {
        let winners = trades.iter().filter(|t| t.profit > Decimal::ZERO).collect();
        let losers = trades.iter().filter(|t| t.profit < Decimal::ZERO).collect();
        (winners, losers)
    }

    fn calculate_win_rate(&self, winning_trades: usize, total_trades: usize) -> Decimal {
        if total_trades == 0 {
            return Decimal::ZERO;
        }

        Decimal::from(winning_trades) / Decimal::from(total_trades) * Decimal::from(100)
    }

    fn calculate_avg_profit(&self, result: &LookbackResult) -> Decimal {
        if result.trades.is_empty() {
            return Decimal::ZERO;
        }

        result.total_profit / Decimal::from(result.trades.len())
    }

    fn calculate_profit_factor(
        &self,
        winners: &[&TradeOutcome],
        losers: &[&TradeOutcome],
    ) -> Option<Decimal> {
        let gross_profit = winners.iter().map(|t| t.profit).sum::<Decimal>();
        let gross_loss = losers.iter().map(|t| t.profit.abs()).sum::<Decimal>();

        if gross_loss.is_zero() {
            return None;
        }

        Some(gross_profit / gross_loss)
    }
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::new()
    }
}
