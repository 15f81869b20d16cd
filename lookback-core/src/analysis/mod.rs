pub mod analyzer;
pub mod errors;
pub mod extrema;
pub mod metrics;
pub mod sweep;
pub mod types;

pub use analyzer::{analyze, LookbackAnalyzer};
pub use errors::AnalysisError;
pub use metrics::MetricsCalculator;
pub use sweep::{percentage_spread, profit_curve, summarize, sweep};
pub use types::*;
