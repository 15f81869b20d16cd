pub mod analysis;
pub mod config;
pub mod report;

pub use lookback_common as common;
