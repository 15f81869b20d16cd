//! Shared data model and input loading for lookback sensitivity analysis.

pub mod data;

pub use data::{
    DataError, LoadOptions, OrderType, PriceBar, PriceTable, TradeEvent, TradeEventKind,
    TradePair,
};
