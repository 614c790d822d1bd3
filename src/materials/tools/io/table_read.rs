use std::path::Path;

use calamine::{DataType, Reader, open_workbook_auto};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use tracing::info;

use crate::materials::tools::error::{Result, ToolError};
use crate::materials::tools::model::{Cell, Table};

/// Export formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Workbook,
}

/// Maps a path to its source format using the file extension.
pub fn detect_format(path: &Path) -> Option<SourceFormat> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "csv" => Some(SourceFormat::Csv),
        "xlsx" | "xls" => Some(SourceFormat::Workbook),
        _ => None,
    }
}

/// Loads a CSV file or the first worksheet of an Excel workbook into a
/// [`Table`]. The first row provides the column names.
pub fn load_table(path: &Path) -> Result<Table> {
    if !path.is_file() {
        return Err(ToolError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let table = match detect_format(path) {
        Some(SourceFormat::Csv) => read_csv(path)?,
        Some(SourceFormat::Workbook) => read_workbook(path)?,
        None => return Err(ToolError::UnsupportedExtension(path.to_path_buf())),
    };

    if table.columns.iter().all(|column| column.trim().is_empty()) {
        return Err(malformed(path, "no header row found"));
    }

    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns.len(),
        "table loaded"
    );
    Ok(table)
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader
        .headers()
        .map_err(|error| malformed(path, &error.to_string()))?
        .clone();
    let mut table = Table::new(headers.iter());

    for record in reader.records() {
        let record = record.map_err(|error| malformed(path, &error.to_string()))?;
        let row: Vec<Cell> = record.iter().map(Cell::infer).collect();
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        table.push_row(row);
    }

    Ok(table)
}

fn read_workbook(path: &Path) -> Result<Table> {
    let mut workbook =
        open_workbook_auto(path).map_err(|error| malformed(path, &error.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| malformed(path, "workbook has no worksheets"))?
        .map_err(|error| malformed(path, &error.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| data_to_cell(cell).key_text())
            .collect(),
        None => return Err(malformed(path, "worksheet is empty")),
    };

    let mut table = Table::new(headers);
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(data_to_cell).collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        table.push_row(cells);
    }

    Ok(table)
}

fn data_to_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::Empty => Cell::Empty,
        DataType::String(value) => Cell::infer(value),
        DataType::Float(value) => Cell::Number(*value),
        DataType::Int(value) => Cell::Number(*value as f64),
        DataType::Bool(value) => Cell::Text(value.to_string()),
        DataType::DateTime(serial) => serial_to_datetime(*serial)
            .map(Cell::Timestamp)
            .unwrap_or(Cell::Number(*serial)),
        DataType::DateTimeIso(value) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
            .map(Cell::Timestamp)
            .unwrap_or_else(|_| Cell::Text(value.clone())),
        other => Cell::Text(other.to_string()),
    }
}

/// Day number of 1899-12-30, the zero point of Excel's 1900 date system,
/// counted from 0001-01-01.
const EXCEL_EPOCH_DAYS_FROM_CE: i64 = 693_594;

/// Converts an Excel 1900-system date serial into a timestamp, rounded to the
/// nearest millisecond.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

/// Inverse of [`serial_to_datetime`].
pub fn datetime_to_serial(value: NaiveDateTime) -> f64 {
    let days = i64::from(value.date().num_days_from_ce()) - EXCEL_EPOCH_DAYS_FROM_CE;
    let time = value.time();
    let millis = i64::from(time.num_seconds_from_midnight()) * 1_000
        + i64::from(time.nanosecond() / 1_000_000);
    days as f64 + millis as f64 / 86_400_000.0
}

fn malformed(path: &Path, reason: &str) -> ToolError {
    ToolError::EmptyOrMalformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
