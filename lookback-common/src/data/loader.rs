// =================================================================
// data/loader.rs - Tabular input loading
// =================================================================

use rust_decimal::Decimal;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use super::types::{DataError, OrderType, PriceBar, TradeEvent};

/// Marker in the `Entry` column that flags an exit row
pub const EXIT_MARKER: &str = "OUT";

const TIME_COLUMN: &str = "time";
const OPEN_COLUMN: &str = "open";
const HIGH_COLUMN: &str = "high";
const LOW_COLUMN: &str = "low";
const CLOSE_COLUMN: &str = "close";
const ORDER_COLUMN: &str = "Order";
const ENTRY_COLUMN: &str = "Entry";
const EXIT_COLUMN: &str = "Exit";

/// Options controlling how a table is read
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Records dropped before the header row (spreadsheet exports often carry a banner row)
    pub skip_rows: usize,
    /// Field delimiter
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            skip_rows: 0,
            delimiter: b',',
        }
    }
}

impl LoadOptions {
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }
}

/// Raw marker cells of one row. Parsed only for rows that turn out to be trade events.
#[derive(Debug, Clone, Default)]
struct MarkerCells {
    order: String,
    entry: String,
    exit: String,
}

/// Column positions resolved from the header row
#[derive(Debug)]
struct ColumnMap {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    markers: Option<(usize, usize, usize)>,
}

impl ColumnMap {
    fn resolve(header: &csv::StringRecord) -> Result<Self, DataError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require =
            |name: &str| find(name).ok_or_else(|| DataError::MissingColumn(name.to_string()));

        let markers = match (find(ORDER_COLUMN), find(ENTRY_COLUMN), find(EXIT_COLUMN)) {
            (Some(order), Some(entry), Some(exit)) => Some((order, entry, exit)),
            (None, None, None) => None,
            (order, entry, _) => {
                // Partial marker columns are a broken export, not a price-only table
                let missing = if order.is_none() {
                    ORDER_COLUMN
                } else if entry.is_none() {
                    ENTRY_COLUMN
                } else {
                    EXIT_COLUMN
                };
                return Err(DataError::MissingColumn(missing.to_string()));
            }
        };

        Ok(Self {
            time: require(TIME_COLUMN)?,
            open: require(OPEN_COLUMN)?,
            high: require(HIGH_COLUMN)?,
            low: require(LOW_COLUMN)?,
            close: require(CLOSE_COLUMN)?,
            markers,
        })
    }
}

/// A fully loaded price series, optionally carrying trade markers
#[derive(Debug, Clone)]
pub struct PriceTable {
    bars: Vec<PriceBar>,
    markers: Option<Vec<MarkerCells>>,
}

impl PriceTable {
    /// Load a table from a file on disk
    pub fn from_path(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, DataError> {
        let file = File::open(path.as_ref())?;
        debug!("Loading price table from {}", path.as_ref().display());
        Self::from_reader(file, options)
    }

    /// Load a table from any reader
    pub fn from_reader<R: Read>(reader: R, options: &LoadOptions) -> Result<Self, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(options.delimiter)
            .from_reader(reader);

        let mut records = reader.records();

        for _ in 0..options.skip_rows {
            match records.next() {
                Some(record) => {
                    record?;
                }
                None => return Err(DataError::EmptyTable),
            }
        }

        let header = records.next().ok_or(DataError::EmptyTable)??;
        let columns = ColumnMap::resolve(&header)?;

        let mut bars = Vec::new();
        let mut markers = columns.markers.map(|_| Vec::new());

        for record in records {
            let record = record?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let row = bars.len();
            let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

            let bar = PriceBar {
                time: cell(columns.time).to_string(),
                open: parse_price(cell(columns.open), row, OPEN_COLUMN)?,
                high: parse_price(cell(columns.high), row, HIGH_COLUMN)?,
                low: parse_price(cell(columns.low), row, LOW_COLUMN)?,
                close: parse_price(cell(columns.close), row, CLOSE_COLUMN)?,
            };

            if !bar.is_consistent() {
                warn!(
                    "Inconsistent bar at row {} ({}): open={} high={} low={} close={}",
                    row, bar.time, bar.open, bar.high, bar.low, bar.close
                );
            }
            bars.push(bar);

            if let (Some(markers), Some((order, entry, exit))) = (markers.as_mut(), columns.markers)
            {
                markers.push(MarkerCells {
                    order: cell(order).to_string(),
                    entry: cell(entry).to_string(),
                    exit: cell(exit).to_string(),
                });
            }
        }

        if bars.is_empty() {
            return Err(DataError::EmptyTable);
        }

        debug!(
            "Loaded {} bars (trade markers: {})",
            bars.len(),
            markers.is_some()
        );

        Ok(Self { bars, markers })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Whether the table carries `Order`/`Entry`/`Exit` columns
    pub fn has_markers(&self) -> bool {
        self.markers.is_some()
    }

    /// Time cells of the first and last bar
    pub fn time_range(&self) -> Option<(&str, &str)> {
        match (self.bars.first(), self.bars.last()) {
            (Some(first), Some(last)) => Some((first.time.as_str(), last.time.as_str())),
            _ => None,
        }
    }

    /// Extract the marked entry and exit rows, in table order.
    ///
    /// A row is an entry when its `Order` cell is `L` or `S`, and an exit when
    /// its `Entry` cell reads `OUT`. The result is validated to alternate
    /// entry/exit with an even length.
    pub fn trade_events(&self) -> Result<Vec<TradeEvent>, DataError> {
        let markers = self
            .markers
            .as_ref()
            .ok_or_else(|| DataError::MissingColumn(ORDER_COLUMN.to_string()))?;

        let mut events = Vec::new();

        for (row, (bar, cells)) in self.bars.iter().zip(markers).enumerate() {
            if let Ok(order_type) = cells.order.parse::<OrderType>() {
                let price = parse_price(&cells.entry, row, ENTRY_COLUMN)?;
                events.push(TradeEvent::entry(row, bar.time.clone(), order_type, price));
            } else if cells.entry == EXIT_MARKER {
                let price = parse_price(&cells.exit, row, EXIT_COLUMN)?;
                events.push(TradeEvent::exit(row, bar.time.clone(), price));
            }
        }

        validate_alternation(&events)?;
        debug!("Extracted {} trade events", events.len());
        Ok(events)
    }
}

fn validate_alternation(events: &[TradeEvent]) -> Result<(), DataError> {
    for (position, event) in events.iter().enumerate() {
        let expect_entry = position % 2 == 0;
        if event.is_entry() != expect_entry {
            return Err(DataError::MalformedTrades(format!(
                "row {} should be an {} but is an {}",
                event.row_index,
                if expect_entry { "entry" } else { "exit" },
                if event.is_entry() { "entry" } else { "exit" },
            )));
        }
    }

    if events.len() % 2 != 0 {
        let last = events.last().map(|e| e.row_index).unwrap_or_default();
        return Err(DataError::MalformedTrades(format!(
            "entry at row {} has no matching exit",
            last
        )));
    }

    Ok(())
}

/// Parse a numeric cell, accepting plain and scientific notation
pub fn parse_price(value: &str, row: usize, column: &str) -> Result<Decimal, DataError> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| DataError::InvalidValue {
            row,
            column: column.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::TradeEventKind;

    const MARKED: &str = "\
Backtest export,,,,,,,
time,open,high,low,close,Order,Entry,Exit
2024-01-01,10,11,9,10.5,,,
2024-01-02,10.5,12,10,11,L,10.6,
2024-01-03,11,13,10.8,12.5,,,
2024-01-04,12.5,12.9,11.7,12,,OUT,12.1
2024-01-05,12,12.2,11,11.5,S,11.9,
2024-01-06,11.5,11.6,10.1,10.4,,OUT,10.3
";

    #[test]
    fn test_load_marked_table_with_banner_row() {
        let options = LoadOptions::default().with_skip_rows(1);
        let table = PriceTable::from_reader(MARKED.as_bytes(), &options).unwrap();

        assert_eq!(table.len(), 6);
        assert!(table.has_markers());
        assert_eq!(table.time_range(), Some(("2024-01-01", "2024-01-06")));
        assert_eq!(table.bars()[1].high, Decimal::from(12));

        let events = table.trade_events().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].row_index, 1);
        assert_eq!(
            events[0].kind,
            TradeEventKind::Entry {
                order_type: OrderType::Long,
                price: Decimal::from_str("10.6").unwrap()
            }
        );
        assert_eq!(
            events[3].kind,
            TradeEventKind::Exit {
                price: Decimal::from_str("10.3").unwrap()
            }
        );
    }

    #[test]
    fn test_price_only_table() {
        let csv = "time,open,high,low,close\nt0,1,2,0.5,1.5\nt1,1.5,2.5,1,2\n";
        let table = PriceTable::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();

        assert_eq!(table.len(), 2);
        assert!(!table.has_markers());
        assert!(matches!(
            table.trade_events(),
            Err(DataError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_header_matching_ignores_case() {
        let csv = " Time ,OPEN,High,Low,Close\nt0,1,2,0.5,1.5\n";
        let table = PriceTable::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(table.bars()[0].time, "t0");
    }

    #[test]
    fn test_missing_column() {
        let csv = "time,open,high,close\nt0,1,2,1.5\n";
        let err = PriceTable::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "low"));
    }

    #[test]
    fn test_partial_marker_columns_rejected() {
        let csv = "time,open,high,low,close,Order,Entry\nt0,1,2,0.5,1.5,,\n";
        let err = PriceTable::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn(ref c) if c == "Exit"));
    }

    #[test]
    fn test_invalid_number() {
        let csv = "time,open,high,low,close\nt0,1,2,0.5,1.5\nt1,1,abc,0.5,1.5\n";
        let err = PriceTable::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        match err {
            DataError::InvalidValue { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "high");
                assert_eq!(value, "abc");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_table() {
        let csv = "time,open,high,low,close\n";
        let err = PriceTable::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DataError::EmptyTable));
    }

    #[test]
    fn test_unmatched_entry_rejected() {
        let csv = "\
time,open,high,low,close,Order,Entry,Exit
t0,1,2,0.5,1.5,,,
t1,1,2,0.5,1.5,L,1.2,
t2,1,2,0.5,1.5,,,
";
        let table = PriceTable::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
        let err = table.trade_events().unwrap_err();
        assert!(matches!(err, DataError::MalformedTrades(_)));
    }

    #[test]
    fn test_lowercase_markers_are_ignored() {
        let csv = "\
time,open,high,low,close,Order,Entry,Exit
t0,1,2,0.5,1.5,l,1.2,
t1,1,2,0.5,1.5,,out,1.4
t2,1,2,0.5,1.5,L,1.2,
t3,1,2,0.5,1.5,,OUT,1.4
";
        let table = PriceTable::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
        let events = table.trade_events().unwrap();

        let rows: Vec<usize> = events.iter().map(|e| e.row_index).collect();
        assert_eq!(rows, vec![2, 3]);
    }

    #[test]
    fn test_exit_before_entry_rejected() {
        let csv = "\
time,open,high,low,close,Order,Entry,Exit
t0,1,2,0.5,1.5,,OUT,1.4
t1,1,2,0.5,1.5,L,1.2,
";
        let table = PriceTable::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
        let err = table.trade_events().unwrap_err();
        assert!(err.to_string().contains("should be an entry"));
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(
            parse_price("1.5e2", 0, "open").unwrap(),
            Decimal::from(150)
        );
        assert!(parse_price("", 0, "open").is_err());
    }
}
