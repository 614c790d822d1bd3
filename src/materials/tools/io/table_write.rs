use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::info;

use crate::materials::tools::error::{Result, ToolError};
use crate::materials::tools::io::table_read::datetime_to_serial;
use crate::materials::tools::model::{Cell, Table};

/// Number format applied to timestamp cells.
pub const TIMESTAMP_NUM_FORMAT: &str = "m/d/yyyy hh:mm";

/// Writes the table to an Excel workbook with a single worksheet.
///
/// `headers` labels the columns of `table` positionally, so internal column
/// names never leak into the header row.
pub fn write_table(path: &Path, table: &Table, headers: &[&str]) -> Result<()> {
    if headers.len() != table.columns.len() {
        return Err(ToolError::WriteFailed {
            path: path.to_path_buf(),
            reason: format!(
                "{} headers given for {} columns",
                headers.len(),
                table.columns.len()
            ),
        });
    }

    build_and_save(path, table, headers).map_err(|error| ToolError::WriteFailed {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;

    info!(path = %path.display(), rows = table.len(), "file saved");
    Ok(())
}

fn build_and_save(
    path: &Path,
    table: &Table,
    headers: &[&str],
) -> std::result::Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();
    let timestamp_format = Format::new().set_num_format(TIMESTAMP_NUM_FORMAT);

    for (col_idx, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col_idx as u16, *header, &header_format)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let sheet_row = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let col = col_idx as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(value) => {
                    worksheet.write_string(sheet_row, col, value)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number(sheet_row, col, *value)?;
                }
                Cell::Timestamp(value) => {
                    worksheet.write_number_with_format(
                        sheet_row,
                        col,
                        datetime_to_serial(*value),
                        &timestamp_format,
                    )?;
                    worksheet.set_column_width(col, 16)?;
                }
            }
        }
    }

    let col_end = (headers.len() as u16).saturating_sub(1);
    worksheet.autofilter(0, 0, table.len() as u32, col_end)?;

    workbook.save(path)?;
    Ok(())
}
