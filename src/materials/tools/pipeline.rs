use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::materials::tools::aggregate::{self, AggregatedReport};
use crate::materials::tools::error::Result;
use crate::materials::tools::io::{table_read, table_write};
use crate::materials::tools::model::{ReportType, Table};

/// Loads an export, aggregates it, and writes the sorted report into
/// `output_dir`. The report type is detected from the columns unless given.
///
/// Nothing is written when loading or aggregation fails.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output_dir = %output_dir.display())
)]
pub fn aggregate_file(
    input: &Path,
    output_dir: &Path,
    report_type: Option<ReportType>,
) -> Result<PathBuf> {
    let table = table_read::load_table(input)?;
    let report = aggregate_table(&table, report_type)?;

    let output = output_dir.join(report.report_type.output_file_name());
    table_write::write_table(&output, &report.table, report.headers)?;
    info!(output = %output.display(), rows = report.table.len(), "report written");
    Ok(output)
}

/// Aggregates an already loaded table.
pub fn aggregate_table(
    table: &Table,
    report_type: Option<ReportType>,
) -> Result<AggregatedReport> {
    let report_type = match report_type {
        Some(report_type) => report_type,
        None => aggregate::classify(table)?,
    };
    debug!(report = %report_type, "report type resolved");
    aggregate::aggregate(table, report_type)
}
