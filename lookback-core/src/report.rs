// =================================================================
// report.rs - Text and JSON rendering of sweep results
// =================================================================

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write;

use crate::analysis::{
    profit_curve, LookbackResult, LookbackStats, MetricsCalculator, SweepSummary,
};

/// Machine-readable output of an `analyze` run
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub tick_offset: Decimal,
    pub lookbacks: Vec<usize>,
    pub summary: Option<SweepSummary>,
    pub stats: Vec<LookbackStats>,
    pub results: Vec<LookbackResult>,
}

impl SweepReport {
    pub fn new(
        source: impl Into<String>,
        tick_offset: Decimal,
        results: Vec<LookbackResult>,
        summary: Option<SweepSummary>,
    ) -> Self {
        let calculator = MetricsCalculator::new();

        Self {
            generated_at: Utc::now(),
            source: source.into(),
            tick_offset,
            lookbacks: results.iter().map(|r| r.lookback).collect(),
            stats: results.iter().map(|r| calculator.calculate(r)).collect(),
            summary,
            results,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn optional(value: Option<Decimal>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "n/a".to_string(),
    }
}

/// Profit over lookback, one line per value
pub fn render_profit_curve(results: &[LookbackResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>10}  {:>14}", "Lookback", "Total profit");
    for (lookback, total) in profit_curve(results) {
        let _ = writeln!(out, "{:>10}  {:>14.4}", lookback, total);
    }
    out
}

pub fn render_summary(summary: Option<&SweepSummary>) -> String {
    let mut out = String::new();
    match summary {
        Some(s) => {
            let _ = writeln!(
                out,
                "Best lookback:  {} (total profit {:.4})",
                s.best_lookback, s.best_total_profit
            );
            let _ = writeln!(
                out,
                "Worst lookback: {} (total profit {:.4})",
                s.worst_lookback, s.worst_total_profit
            );
            let _ = writeln!(
                out,
                "Percentage difference between max and min: {}",
                optional(s.spread)
            );
        }
        None => {
            let _ = writeln!(out, "No lookback values analyzed");
        }
    }
    out
}

pub fn render_stats(stats: &[LookbackStats]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>10}  {:>7}  {:>5}  {:>6}  {:>8}  {:>12}  {:>12}  {:>10}  {:>8}",
        "Lookback", "Trades", "Wins", "2nd", "Win %", "Avg profit", "Largest loss", "Max DD", "PF"
    );
    for s in stats {
        let _ = writeln!(
            out,
            "{:>10}  {:>7}  {:>5}  {:>6}  {:>8.2}  {:>12.4}  {:>12.4}  {:>10.4}  {:>8}",
            s.lookback,
            s.total_trades,
            s.winning_trades,
            s.second_order_trades,
            s.win_rate,
            s.avg_profit_per_trade,
            s.largest_losing_trade,
            s.max_drawdown,
            optional(s.profit_factor)
        );
    }
    out
}

/// Individual transactions across every lookback value
pub fn render_trades(results: &[LookbackResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>8}  {:>6}  {:<20}  {:>6}  {:<20}  {:<5}  {:>10}  {:>10}  {:>10}  {:>10}  {:<3}  {:>10}  {:>10}  {:>8}",
        "Lookback", "Entry", "Entry time", "Exit", "Exit time", "Order", "Entry px", "Exit px",
        "Optimal", "DD px", "2nd", "Profit", "Drawdown", "PF"
    );
    for result in results {
        for t in &result.trades {
            let _ = writeln!(
                out,
                "{:>8}  {:>6}  {:<20}  {:>6}  {:<20}  {:<5}  {:>10}  {:>10}  {:>10}  {:>10}  {:<3}  {:>10.4}  {:>10.4}  {:>8}",
                t.lookback,
                t.entry_index,
                t.entry_time,
                t.exit_index,
                t.exit_time,
                t.order_type,
                t.entry_price,
                t.exit_price,
                t.optimal_price,
                t.drawdown_price,
                if t.is_second_order { "yes" } else { "no" },
                t.profit,
                t.drawdown,
                optional(t.profit_factor)
            );
        }
    }
    out
}

/// Full text output of an `analyze` run: curve, summary, statistics and transactions
pub fn render_analysis(
    results: &[LookbackResult],
    summary: Option<&SweepSummary>,
    stats: &[LookbackStats],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nProfit over lookback:");
    out.push_str(&render_profit_curve(results));
    out.push('\n');
    out.push_str(&render_summary(summary));
    let _ = writeln!(out, "\nLookback statistics:");
    out.push_str(&render_stats(stats));
    let _ = writeln!(out, "\nIndividual transactions:");
    out.push_str(&render_trades(results));
    out
}
