//! Deduplication and aggregation of daily exports.
//!
//! Each record is given an identity key built from its business fields. Records
//! sharing a key are collapsed into one row: production picks are summed, bin
//! counts keep the latest count taken on the same day.

pub mod key;

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::materials::tools::error::{Result, ToolError};
use crate::materials::tools::model::{Cell, EMPTY_CELL, ReportType, Table};

pub use crate::materials::tools::model::{
    APPLICATION, BIN_COUNT_HEADERS, BIN_ID, BIN_SOURCE, BUILDING, COUNT_DATE, COUNT_QTY,
    COUNTED_BY, DELTA, FACILITY_ID, PART_DESC, PART_NBR, PRODUCTION_COLUMNS, PRODUCTION_HEADERS,
    SUB_CODE, SYSTEM_QTY, TXN_DATE, TXN_QTY, USER_NAME,
};
pub use key::{BinCountKey, ProductionKey};

/// Text layout of timestamps in the materials system exports.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Column whose presence marks a production export.
pub const PRODUCTION_MARKER: &str = "Production";
/// Column whose presence marks a bin count export.
pub const BIN_MARKER: &str = "Bin";

/// Application value of the rows kept in a production report.
pub const PICKING: &str = "PICKING";

/// Spellings accepted for a canonical column name. The exports are not
/// consistent about spaces versus underscores.
fn spellings(column: &'static str) -> &'static [&'static str] {
    match column {
        USER_NAME => &["USER_NAME", "USER NAME"],
        SUB_CODE => &["SUB_CODE", "SUB CODE"],
        PART_NBR => &["PART_NBR"],
        BIN_ID => &["BIN_ID"],
        TXN_QTY => &["TXN_QTY"],
        TXN_DATE => &["TXN_DATE"],
        APPLICATION => &["APPLICATION"],
        FACILITY_ID => &["FACILITY_ID"],
        BIN_SOURCE => &["BIN_SOURCE"],
        BUILDING => &["BUILDING"],
        PART_DESC => &["PART_DESC"],
        SYSTEM_QTY => &["SYSTEM_QTY"],
        COUNT_QTY => &["COUNT_QTY"],
        DELTA => &["DELTA"],
        COUNT_DATE => &["COUNT_DATE"],
        COUNTED_BY => &["COUNTED_BY"],
        _ => &[],
    }
}

/// Result of aggregating one export.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedReport {
    pub report_type: ReportType,
    /// Deduplicated rows under the canonical column names.
    pub table: Table,
    /// Display headers, one per column of `table`.
    pub headers: &'static [&'static str],
}

/// Determines which report a table holds from its column names.
pub fn classify(table: &Table) -> Result<ReportType> {
    if table.has_column(PRODUCTION_MARKER)
        || (table.has_column(APPLICATION) && table.has_column(TXN_DATE))
    {
        return Ok(ReportType::Production);
    }
    if table.has_column(BIN_MARKER) || table.has_column(COUNT_DATE) {
        return Ok(ReportType::BinCount);
    }
    Err(ToolError::UnrecognizedReportType {
        columns: table.columns.clone(),
    })
}

/// Classifies the table and aggregates it.
pub fn aggregate_detected(table: &Table) -> Result<AggregatedReport> {
    let report_type = classify(table)?;
    aggregate(table, report_type)
}

/// Collapses records sharing an identity key according to the report's rule.
pub fn aggregate(table: &Table, report_type: ReportType) -> Result<AggregatedReport> {
    let aggregated = match report_type {
        ReportType::Production => aggregate_production(table)?,
        ReportType::BinCount => aggregate_bin_counts(table)?,
    };
    info!(
        report = %report_type,
        input_rows = table.len(),
        output_rows = aggregated.len(),
        "aggregated report"
    );
    Ok(AggregatedReport {
        report_type,
        table: aggregated,
        headers: report_type.display_headers(),
    })
}

/// Reads a timestamp from a cell. Text must follow [`TIMESTAMP_FORMAT`];
/// workbook date cells are taken as they are.
pub fn parse_timestamp(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Timestamp(value) => Some(*value),
        Cell::Text(value) => NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok(),
        Cell::Empty | Cell::Number(_) => None,
    }
}

struct ColumnMap {
    indices: Vec<usize>,
}

impl ColumnMap {
    fn resolve(table: &Table, report_type: ReportType, columns: &[&'static str]) -> Result<Self> {
        let indices = columns
            .iter()
            .map(|column| {
                table
                    .find_column(spellings(*column))
                    .ok_or_else(|| ToolError::MissingColumn {
                        report: report_type.to_string(),
                        column: column.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { indices })
    }

    fn cell<'a>(&self, row: &'a [Cell], position: usize) -> &'a Cell {
        row.get(self.indices[position]).unwrap_or(&EMPTY_CELL)
    }

    fn text(&self, row: &[Cell], position: usize) -> String {
        self.cell(row, position).key_text()
    }
}

// Row numbers in messages count the header as row 1, as a spreadsheet does.
fn sheet_row(index: usize) -> usize {
    index + 2
}

fn timestamp_at(cell: &Cell, column: &str, index: usize) -> Result<NaiveDateTime> {
    parse_timestamp(cell).ok_or_else(|| ToolError::MalformedTimestamp {
        column: column.to_string(),
        row: sheet_row(index),
        value: cell.key_text(),
    })
}

// Positions inside the production ColumnMap.
const P_PART: usize = 0;
const P_BIN: usize = 1;
const P_QTY: usize = 2;
const P_USER: usize = 3;
const P_DATE: usize = 4;
const P_SUB: usize = 5;
const P_APPLICATION: usize = 6;

struct ProductionGroup {
    first: usize,
    timestamp: NaiveDateTime,
    quantity: f64,
}

fn aggregate_production(table: &Table) -> Result<Table> {
    let mut required = PRODUCTION_COLUMNS.to_vec();
    required.push(APPLICATION);
    let columns = ColumnMap::resolve(table, ReportType::Production, &required)?;

    let mut groups: BTreeMap<ProductionKey, ProductionGroup> = BTreeMap::new();
    let mut picked = 0usize;

    for (index, row) in table.rows.iter().enumerate() {
        let date_cell = columns.cell(row, P_DATE);
        let is_picking = columns.text(row, P_APPLICATION) == PICKING;

        // Blank dates only matter on rows that survive the filter.
        if !is_picking {
            if !date_cell.is_empty() {
                timestamp_at(date_cell, TXN_DATE, index)?;
            }
            continue;
        }
        let timestamp = timestamp_at(date_cell, TXN_DATE, index)?;
        picked += 1;

        let quantity_cell = columns.cell(row, P_QTY);
        let quantity = if quantity_cell.is_empty() {
            0.0
        } else {
            quantity_cell
                .as_number()
                .ok_or_else(|| ToolError::InvalidQuantity {
                    column: TXN_QTY.to_string(),
                    row: sheet_row(index),
                    value: quantity_cell.key_text(),
                })?
        };

        let key = ProductionKey::new(
            columns.text(row, P_PART),
            columns.text(row, P_BIN),
            columns.text(row, P_USER),
            timestamp,
            columns.text(row, P_SUB),
        );
        groups
            .entry(key)
            .and_modify(|group| group.quantity += quantity)
            .or_insert(ProductionGroup {
                first: index,
                timestamp,
                quantity,
            });
    }

    debug!(picked, groups = groups.len(), "grouped production picks");

    let mut output = Table::new(PRODUCTION_COLUMNS.iter().copied());
    for group in groups.values() {
        let row = &table.rows[group.first];
        output.push_row(vec![
            columns.cell(row, P_PART).clone(),
            columns.cell(row, P_BIN).clone(),
            Cell::Number(group.quantity),
            columns.cell(row, P_USER).clone(),
            Cell::Timestamp(group.timestamp),
            columns.cell(row, P_SUB).clone(),
        ]);
    }
    Ok(output)
}

// Positions inside the bin count ColumnMap, following BIN_COUNT_HEADERS.
const B_FACILITY: usize = 0;
const B_SOURCE: usize = 1;
const B_BUILDING: usize = 2;
const B_BIN: usize = 3;
const B_PART: usize = 4;
const B_SYSTEM_QTY: usize = 6;
const B_DATE: usize = 9;
const B_COUNTED_BY: usize = 10;

fn aggregate_bin_counts(table: &Table) -> Result<Table> {
    let columns = ColumnMap::resolve(table, ReportType::BinCount, BIN_COUNT_HEADERS)?;

    let mut timed = Vec::with_capacity(table.len());
    for (index, row) in table.rows.iter().enumerate() {
        let timestamp = timestamp_at(columns.cell(row, B_DATE), COUNT_DATE, index)?;
        timed.push((timestamp, index));
    }
    // Stable: rows with equal timestamps keep their input order.
    timed.sort_by_key(|(timestamp, _)| *timestamp);

    let mut latest: BTreeMap<BinCountKey, (NaiveDateTime, usize)> = BTreeMap::new();
    for (timestamp, index) in timed {
        let row = &table.rows[index];
        let key = BinCountKey {
            facility_id: columns.text(row, B_FACILITY),
            bin_source: columns.text(row, B_SOURCE),
            building: columns.text(row, B_BUILDING),
            bin_id: columns.text(row, B_BIN),
            part_number: columns.text(row, B_PART),
            system_qty: columns.text(row, B_SYSTEM_QTY),
            minute: key::truncate_to_minute(timestamp),
            counted_by: columns.text(row, B_COUNTED_BY),
            count_day: timestamp.date(),
        };
        if let Some((_, superseded)) = latest.insert(key, (timestamp, index)) {
            debug!(
                row = sheet_row(superseded),
                by = sheet_row(index),
                "bin count superseded by later count"
            );
        }
    }

    let mut output = Table::new(BIN_COUNT_HEADERS.iter().copied());
    for (timestamp, index) in latest.into_values() {
        let row = &table.rows[index];
        let cells = (0..BIN_COUNT_HEADERS.len())
            .map(|position| {
                if position == B_DATE {
                    Cell::Timestamp(timestamp)
                } else {
                    columns.cell(row, position).clone()
                }
            })
            .collect();
        output.push_row(cells);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_export_timestamps() {
        let parsed = parse_timestamp(&Cell::Text("1/2/2024 10:15:00 AM".into()))
            .expect("timestamp parsed");
        assert_eq!(parsed.to_string(), "2024-01-02 10:15:00");

        let afternoon = parse_timestamp(&Cell::Text("12/31/2023 01:05:09 PM".into()))
            .expect("timestamp parsed");
        assert_eq!(afternoon.to_string(), "2023-12-31 13:05:09");
    }

    #[test]
    fn rejects_other_timestamp_layouts() {
        assert!(parse_timestamp(&Cell::Text("2024-01-02 10:15:00".into())).is_none());
        assert!(parse_timestamp(&Cell::Text("1/2/2024 10:15 AM".into())).is_none());
        assert!(parse_timestamp(&Cell::Number(45293.0)).is_none());
        assert!(parse_timestamp(&Cell::Empty).is_none());
    }

    #[test]
    fn classification_prefers_production_marker() {
        let table = Table::new(["Production", "Bin"]);
        assert_eq!(classify(&table).expect("classified"), ReportType::Production);

        let table = Table::new(["FACILITY_ID", "COUNT_DATE"]);
        assert_eq!(classify(&table).expect("classified"), ReportType::BinCount);
    }
}
