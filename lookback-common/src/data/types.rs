// lookback-common/src/data/types.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error types for loading and validating tabular input
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Table contains no data rows")]
    EmptyTable,

    #[error("Malformed trade sequence: {0}")]
    MalformedTrades(String),
}

/// One row of the historical price series.
///
/// Bars are addressed by position in the loaded table, so the row index of a
/// bar is its index in the owning `Vec<PriceBar>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Raw time cell as it appeared in the source table
    pub time: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl PriceBar {
    pub fn new(
        time: impl Into<String>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> Self {
        Self {
            time: time.into(),
            open,
            high,
            low,
            close,
        }
    }

    /// High must not be below low, and open/close must sit inside the range
    pub fn is_consistent(&self) -> bool {
        self.high >= self.low
            && self.open <= self.high
            && self.open >= self.low
            && self.close <= self.high
            && self.close >= self.low
    }
}

/// Direction of a marked trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Long,
    Short,
}

impl OrderType {
    /// Single-letter marker used in the `Order` column
    pub fn as_marker(&self) -> &'static str {
        match self {
            OrderType::Long => "L",
            OrderType::Short => "S",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_marker())
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L" => Ok(OrderType::Long),
            "S" => Ok(OrderType::Short),
            other => Err(format!("Unknown order marker '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TradeEventKind {
    Entry { order_type: OrderType, price: Decimal },
    Exit { price: Decimal },
}

/// A marked row of the price table: either an entry or the exit that closes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub row_index: usize,
    pub time: String,
    pub kind: TradeEventKind,
}

impl TradeEvent {
    pub fn entry(
        row_index: usize,
        time: impl Into<String>,
        order_type: OrderType,
        price: Decimal,
    ) -> Self {
        Self {
            row_index,
            time: time.into(),
            kind: TradeEventKind::Entry { order_type, price },
        }
    }

    pub fn exit(row_index: usize, time: impl Into<String>, price: Decimal) -> Self {
        Self {
            row_index,
            time: time.into(),
            kind: TradeEventKind::Exit { price },
        }
    }

    pub fn is_entry(&self) -> bool {
        matches!(self.kind, TradeEventKind::Entry { .. })
    }
}

/// An entry event joined with the exit event that follows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePair {
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_time: String,
    pub exit_time: String,
    pub order_type: OrderType,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
}

impl TradePair {
    /// Pair up an alternating entry/exit sequence.
    ///
    /// Fails when the sequence has odd length, does not alternate, or an exit
    /// does not come after its entry.
    pub fn from_events(events: &[TradeEvent]) -> Result<Vec<TradePair>, DataError> {
        if events.len() % 2 != 0 {
            return Err(DataError::MalformedTrades(format!(
                "expected an even number of entry/exit rows, found {}",
                events.len()
            )));
        }

        let mut pairs = Vec::with_capacity(events.len() / 2);

        for chunk in events.chunks_exact(2) {
            let (entry, exit) = (&chunk[0], &chunk[1]);

            let (order_type, entry_price) = match entry.kind {
                TradeEventKind::Entry { order_type, price } => (order_type, price),
                TradeEventKind::Exit { .. } => {
                    return Err(DataError::MalformedTrades(format!(
                        "row {} is an exit without a preceding entry",
                        entry.row_index
                    )));
                }
            };

            let exit_price = match exit.kind {
                TradeEventKind::Exit { price } => price,
                TradeEventKind::Entry { .. } => {
                    return Err(DataError::MalformedTrades(format!(
                        "entry at row {} is followed by another entry at row {}",
                        entry.row_index, exit.row_index
                    )));
                }
            };

            if exit.row_index <= entry.row_index {
                return Err(DataError::MalformedTrades(format!(
                    "exit row {} does not come after entry row {}",
                    exit.row_index, entry.row_index
                )));
            }

            pairs.push(TradePair {
                entry_index: entry.row_index,
                exit_index: exit.row_index,
                entry_time: entry.time.clone(),
                exit_time: exit.time.clone(),
                order_type,
                entry_price,
                exit_price,
            });
        }

        Ok(pairs)
    }
}
