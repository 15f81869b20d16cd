pub mod loader;
pub mod types;

pub use loader::{parse_price, LoadOptions, PriceTable, EXIT_MARKER};
pub use types::*;
