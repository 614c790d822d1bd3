use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Represents a single cell of a loaded export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Cell {
    /// Blank cell.
    Empty,
    /// Plain text value.
    Text(String),
    /// Numeric value. Integers are stored as whole floats, as spreadsheets do.
    Number(f64),
    /// Date and time value, either parsed from text or read from a workbook.
    Timestamp(NaiveDateTime),
}

/// Shared blank cell handed out for positions past the end of a row.
pub static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Builds a cell from raw delimited text.
    ///
    /// Numeric text only becomes a [`Cell::Number`] when rendering the number
    /// back gives the same text, so identifiers such as `0042` or `1e3` stay
    /// textual and keep their exact spelling in identity keys.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() && format_number(number) == trimmed => {
                Cell::Number(number)
            }
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    /// Whether the cell is blank or holds only whitespace.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => value.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering used when a cell takes part in an identity key.
    pub fn key_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(value) => value.trim().to_string(),
            Cell::Number(value) => format_number(*value),
            Cell::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// Numeric view of the cell. Blank cells have no number; text is parsed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(value) => value.trim().parse::<f64>().ok(),
            Cell::Empty | Cell::Timestamp(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Timestamp(value) => write!(f, "{}", value.format("%-m/%-d/%Y %H:%M")),
            other => f.write_str(&other.key_text()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::infer(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(value: NaiveDateTime) -> Self {
        Cell::Timestamp(value)
    }
}

/// Renders whole numbers without a fractional part (`3` rather than `3.0`).
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// An in-memory table: named columns over rows of cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Creates an empty table with the provided column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding with blanks or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Number of data rows, excluding the header.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column with exactly this (trimmed) name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.trim() == name)
    }

    /// Position of the first column matching any of the given spellings.
    pub fn find_column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| self.column_index(name))
    }

    /// Whether a column with exactly this (trimmed) name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterates over the cells of one column.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| row.get(index).unwrap_or(&EMPTY_CELL))
    }
}

// Canonical column names of the materials system exports.
pub const PART_NBR: &str = "PART_NBR";
pub const BIN_ID: &str = "BIN_ID";
pub const TXN_QTY: &str = "TXN_QTY";
pub const USER_NAME: &str = "USER_NAME";
pub const TXN_DATE: &str = "TXN_DATE";
pub const SUB_CODE: &str = "SUB_CODE";
pub const APPLICATION: &str = "APPLICATION";

pub const FACILITY_ID: &str = "FACILITY_ID";
pub const BIN_SOURCE: &str = "BIN_SOURCE";
pub const BUILDING: &str = "BUILDING";
pub const PART_DESC: &str = "PART_DESC";
pub const SYSTEM_QTY: &str = "SYSTEM_QTY";
pub const COUNT_QTY: &str = "COUNT_QTY";
pub const DELTA: &str = "DELTA";
pub const COUNT_DATE: &str = "COUNT_DATE";
pub const COUNTED_BY: &str = "COUNTED_BY";

/// Display headers of the production report, positionally matching
/// [`PRODUCTION_COLUMNS`].
pub const PRODUCTION_HEADERS: &[&str] = &[
    "PART_NBR",
    "BIN_ID",
    "TXN_QTY",
    "USER NAME",
    "TXN_DATE",
    "SUB CODE",
];

/// Internal column names of the aggregated production table.
pub const PRODUCTION_COLUMNS: &[&str] =
    &[PART_NBR, BIN_ID, TXN_QTY, USER_NAME, TXN_DATE, SUB_CODE];

/// Display headers of the bin count report. Internal names are identical.
pub const BIN_COUNT_HEADERS: &[&str] = &[
    FACILITY_ID,
    BIN_SOURCE,
    BUILDING,
    BIN_ID,
    PART_NBR,
    PART_DESC,
    SYSTEM_QTY,
    COUNT_QTY,
    DELTA,
    COUNT_DATE,
    COUNTED_BY,
];

/// The two report kinds the aggregator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    /// Production picking transactions, summed per identity key.
    Production,
    /// Bin counts, where the latest count per identity key and day wins.
    BinCount,
}

impl ReportType {
    /// File name the aggregated report is saved under.
    pub fn output_file_name(self) -> &'static str {
        match self {
            ReportType::Production => "Sorted Production.xlsx",
            ReportType::BinCount => "Sorted Bin Counts.xlsx",
        }
    }

    /// Header row written for the aggregated report.
    pub fn display_headers(self) -> &'static [&'static str] {
        match self {
            ReportType::Production => PRODUCTION_HEADERS,
            ReportType::BinCount => BIN_COUNT_HEADERS,
        }
    }

    /// Canonical column names of the aggregated table.
    pub fn output_columns(self) -> &'static [&'static str] {
        match self {
            ReportType::Production => PRODUCTION_COLUMNS,
            ReportType::BinCount => BIN_COUNT_HEADERS,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportType::Production => write!(f, "production"),
            ReportType::BinCount => write!(f, "bin count"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_and_columns_line_up() {
        for report in [ReportType::Production, ReportType::BinCount] {
            assert_eq!(report.display_headers().len(), report.output_columns().len());
        }
    }

    #[test]
    fn infer_keeps_identifiers_textual() {
        assert_eq!(Cell::infer("42"), Cell::Number(42.0));
        assert_eq!(Cell::infer(" 2.5 "), Cell::Number(2.5));
        assert_eq!(Cell::infer("-3"), Cell::Number(-3.0));
        assert_eq!(Cell::infer("0042"), Cell::Text("0042".into()));
        assert_eq!(Cell::infer("3.50"), Cell::Text("3.50".into()));
        assert_eq!(Cell::infer("A1"), Cell::Text("A1".into()));
        assert_eq!(Cell::infer("   "), Cell::Empty);
    }

    #[test]
    fn key_text_drops_trailing_zero_fraction() {
        assert_eq!(Cell::Number(8.0).key_text(), "8");
        assert_eq!(Cell::Number(1.25).key_text(), "1.25");
        assert_eq!(Cell::Text(" B1 ".into()).key_text(), "B1");
    }

    #[test]
    fn push_row_normalises_width() {
        let mut table = Table::new(["A", "B"]);
        table.push_row(vec![Cell::from("x")]);
        table.push_row(vec![Cell::from("1"), Cell::from("2"), Cell::from("3")]);
        assert_eq!(table.rows[0], vec![Cell::Text("x".into()), Cell::Empty]);
        assert_eq!(table.rows[1].len(), 2);
    }
}
