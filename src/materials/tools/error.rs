use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool loads, aggregates, or writes report data.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as listing or renaming files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the CSV reader.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Raised when the requested export does not exist.
    #[error("that file doesn't exist in {}: {}", directory_of(.path), .path.display())]
    FileNotFound { path: PathBuf },

    /// Raised when an export has no header row or cannot be parsed.
    #[error("there was an issue with the file content of {}: {reason}", .path.display())]
    EmptyOrMalformed { path: PathBuf, reason: String },

    /// Raised for files that are neither CSV nor Excel workbooks.
    #[error("unsupported file format: {} (expected .csv, .xlsx or .xls)", .0.display())]
    UnsupportedExtension(PathBuf),

    /// Raised when the table carries neither a production nor a bin count marker.
    #[error("unrecognised report type; columns found: {}", .columns.join(", "))]
    UnrecognizedReportType { columns: Vec<String> },

    /// Raised when a report is missing one of the columns it is aggregated on.
    #[error("{report} report is missing required column '{column}'")]
    MissingColumn { report: String, column: String },

    /// Raised when a timestamp does not follow `m/d/Y I:M:S AM|PM`.
    #[error("malformed timestamp '{value}' in column {column} (row {row})")]
    MalformedTimestamp {
        column: String,
        row: usize,
        value: String,
    },

    /// Raised when a quantity cell holds non-numeric text.
    #[error("invalid quantity '{value}' in column {column} (row {row})")]
    InvalidQuantity {
        column: String,
        row: usize,
        value: String,
    },

    /// Raised when one or more daily exports could not be found.
    #[error("incomplete batch in {}: missing {}", .directory.display(), .missing.join(", "))]
    IncompleteBatch {
        directory: PathBuf,
        missing: Vec<String>,
    },

    /// Raised when the aggregated workbook cannot be written.
    #[error("failed to write {}: {reason}", .path.display())]
    WriteFailed { path: PathBuf, reason: String },

    /// Raised when the working directory does not exist.
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// Raised when no download directory can be resolved for the user.
    #[error("could not determine a working directory; pass --dir or set MATERIALS_DIR")]
    NoDefaultDirectory,

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

fn directory_of(path: &std::path::Path) -> String {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| parent.display().to_string())
        .unwrap_or_else(|| ".".to_string())
}
