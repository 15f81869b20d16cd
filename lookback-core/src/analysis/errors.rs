use lookback_common::DataError;
use thiserror::Error;

/// Analysis error types
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Invalid lookback {lookback}: {}", lookback_reason(.lookback, .entry_index))]
    InvalidLookback { lookback: usize, entry_index: usize },

    #[error("Price arithmetic overflowed for the trade entered at row {entry_index} (lookback {lookback})")]
    Overflow { lookback: usize, entry_index: usize },

    #[error("Trade row {row} is outside the price series ({bars} bars)")]
    RowOutOfRange { row: usize, bars: usize },

    #[error("Invalid lookback range: {0}")]
    InvalidRange(String),

    #[error("Degenerate sweep: {0}")]
    DegenerateSweep(String),

    #[error("Sweep cancelled after {completed} of {total} lookback values")]
    Cancelled { completed: usize, total: usize },
}

impl AnalysisError {
    /// Errors caused by the input rather than by the requested parameters
    pub fn is_input_error(&self) -> bool {
        match self {
            AnalysisError::Data(_) => true,
            AnalysisError::RowOutOfRange { .. } => true,
            AnalysisError::Overflow { .. } => true,
            AnalysisError::InvalidLookback { .. } => false,
            AnalysisError::InvalidRange(_) => false,
            AnalysisError::DegenerateSweep(_) => false,
            AnalysisError::Cancelled { .. } => false,
        }
    }
}

fn lookback_reason(lookback: &usize, entry_index: &usize) -> String {
    if *lookback == 0 {
        "the window must span at least one bar".to_string()
    } else {
        format!(
            "entry at row {} has only {} preceding bars",
            entry_index, entry_index
        )
    }
}
