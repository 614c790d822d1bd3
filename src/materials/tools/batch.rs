//! Collection of the daily export batch.
//!
//! Every morning the materials system drops seven exports into the download
//! directory. A batch is complete when one export of each category was
//! modified today.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::materials::tools::error::{Result, ToolError};
use crate::materials::tools::io::table_read::{detect_format, load_table};
use crate::materials::tools::model::Table;

/// The export categories making up a daily batch, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchCategory {
    MinMax,
    CiReorder,
    CiShortage,
    ClearToBuild,
    OnHandBalance,
    OpenPurchaseOrders,
    ProductionReport,
}

impl BatchCategory {
    pub const ALL: [BatchCategory; 7] = [
        BatchCategory::MinMax,
        BatchCategory::CiReorder,
        BatchCategory::CiShortage,
        BatchCategory::ClearToBuild,
        BatchCategory::OnHandBalance,
        BatchCategory::OpenPurchaseOrders,
        BatchCategory::ProductionReport,
    ];

    /// Substring identifying the category in an export's file name.
    pub fn pattern(self) -> &'static str {
        match self {
            BatchCategory::MinMax => "min_max",
            BatchCategory::CiReorder => "ci_reorder",
            BatchCategory::CiShortage => "ci_shortage",
            BatchCategory::ClearToBuild => "CTB_",
            BatchCategory::OnHandBalance => "OHB_report",
            BatchCategory::OpenPurchaseOrders => "Open PO",
            BatchCategory::ProductionReport => "Production Report",
        }
    }
}

impl fmt::Display for BatchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatchCategory::MinMax => "min/max",
            BatchCategory::CiReorder => "CI reorder",
            BatchCategory::CiShortage => "CI shortage",
            BatchCategory::ClearToBuild => "clear to build",
            BatchCategory::OnHandBalance => "on-hand balance",
            BatchCategory::OpenPurchaseOrders => "open PO",
            BatchCategory::ProductionReport => "production report",
        };
        f.write_str(label)
    }
}

/// The min/max export is published under a `ci_reorder` name; only the
/// `ci_reorder..._all` export is the actual reorder report.
fn is_legacy_min_max(name: &str) -> bool {
    name.contains(BatchCategory::CiReorder.pattern()) && !name.contains("_all")
}

/// Determines the batch category of an export from its file name.
pub fn classify_file_name(name: &str) -> Option<BatchCategory> {
    if is_legacy_min_max(name) {
        return Some(BatchCategory::MinMax);
    }
    BatchCategory::ALL
        .into_iter()
        .find(|category| name.contains(category.pattern()))
}

/// Renames legacy min/max exports to `min_max.<ext>` so the directory reads
/// the same way the batch is classified. Returns the new paths.
#[instrument(level = "info", skip_all, fields(directory = %directory.display()))]
pub fn normalize_legacy_names(directory: &Path) -> Result<Vec<PathBuf>> {
    ensure_directory(directory)?;

    let mut renamed = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_legacy_min_max(&name) {
            continue;
        }

        let target_name = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{ext}", BatchCategory::MinMax.pattern()),
            None => BatchCategory::MinMax.pattern().to_string(),
        };
        let target = directory.join(target_name);
        if target.exists() {
            warn!(from = %name, to = %target.display(), "rename target exists, skipping");
            continue;
        }
        fs::rename(&path, &target)?;
        info!(from = %name, to = %target.display(), "renamed legacy export");
        renamed.push(target);
    }

    Ok(renamed)
}

/// A loaded export belonging to a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub category: BatchCategory,
    pub path: PathBuf,
    pub table: Table,
}

/// The seven exports of a day, in [`BatchCategory::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub entries: Vec<BatchEntry>,
}

/// Compact description of a batch entry, used for CLI output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub category: BatchCategory,
    pub file: String,
    pub rows: usize,
    pub columns: usize,
}

impl Batch {
    /// Table loaded for `category`.
    pub fn get(&self, category: BatchCategory) -> Option<&Table> {
        self.entries
            .iter()
            .find(|entry| entry.category == category)
            .map(|entry| &entry.table)
    }

    /// Number of loaded exports.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no export was loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the batch, keeping the tables in category order.
    pub fn into_tables(self) -> Vec<Table> {
        self.entries.into_iter().map(|entry| entry.table).collect()
    }

    /// One summary line per export.
    pub fn summary(&self) -> Vec<BatchSummary> {
        self.entries
            .iter()
            .map(|entry| BatchSummary {
                category: entry.category,
                file: entry
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                rows: entry.table.len(),
                columns: entry.table.columns.len(),
            })
            .collect()
    }
}

/// Gathers the exports modified on `today` and loads one per category.
///
/// When a category has several candidates the most recently modified file is
/// used. Only `.csv`, `.xlsx` and `.xls` files count, and workbook lock files
/// are skipped. Missing categories fail the whole batch, as does any load
/// failure.
#[instrument(level = "info", skip_all, fields(directory = %directory.display(), today = %today))]
pub fn collect_batch(directory: &Path, today: NaiveDate) -> Result<Batch> {
    ensure_directory(directory)?;

    let mut selected: BTreeMap<BatchCategory, (SystemTime, PathBuf)> = BTreeMap::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if DateTime::<Local>::from(modified).date_naive() != today {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_loadable_export(&name, &path) {
            debug!(file = %name, "ignoring file that is not a table export");
            continue;
        }
        let Some(category) = classify_file_name(&name) else {
            debug!(file = %name, "ignoring unrelated file");
            continue;
        };

        match selected.entry(category) {
            Entry::Vacant(slot) => {
                slot.insert((modified, path));
            }
            Entry::Occupied(mut slot) => {
                let (kept, dropped) = if modified > slot.get().0 {
                    let previous = slot.insert((modified, path));
                    (slot.get().1.clone(), previous.1)
                } else {
                    (slot.get().1.clone(), path)
                };
                warn!(
                    %category,
                    kept = %kept.display(),
                    ignored = %dropped.display(),
                    "several exports for one category"
                );
            }
        }
    }

    let missing: Vec<String> = BatchCategory::ALL
        .iter()
        .filter(|category| !selected.contains_key(*category))
        .map(|category| format!("{category} ({})", category.pattern()))
        .collect();
    if !missing.is_empty() {
        return Err(ToolError::IncompleteBatch {
            directory: directory.to_path_buf(),
            missing,
        });
    }

    let entries = selected
        .into_iter()
        .map(|(category, (_, path))| {
            let table = load_table(&path)?;
            Ok(BatchEntry {
                category,
                path,
                table,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(exports = entries.len(), "batch collected");
    Ok(Batch { entries })
}

/// Lock files left by an open workbook start with `~$`.
fn is_loadable_export(name: &str, path: &Path) -> bool {
    !name.starts_with("~$") && detect_format(path).is_some()
}

fn ensure_directory(directory: &Path) -> Result<()> {
    if directory.is_dir() {
        Ok(())
    } else {
        Err(ToolError::MissingDirectory(directory.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_daily_export_names() {
        let cases = [
            ("min_max.xlsx", Some(BatchCategory::MinMax)),
            ("ci_reorder_2024.csv", Some(BatchCategory::MinMax)),
            ("ci_reorder_all.csv", Some(BatchCategory::CiReorder)),
            ("ci_shortage (3).xlsx", Some(BatchCategory::CiShortage)),
            ("CTB_weekly.xlsx", Some(BatchCategory::ClearToBuild)),
            ("OHB_report.csv", Some(BatchCategory::OnHandBalance)),
            ("Open PO Lines.xlsx", Some(BatchCategory::OpenPurchaseOrders)),
            ("Production Report.csv", Some(BatchCategory::ProductionReport)),
            ("Sorted Production.xlsx", None),
            ("notes.txt", None),
        ];
        for (name, expected) in cases {
            assert_eq!(classify_file_name(name), expected, "{name}");
        }
    }

    #[test]
    fn only_table_files_are_candidates() {
        assert!(is_loadable_export("OHB_report.csv", Path::new("OHB_report.csv")));
        assert!(!is_loadable_export("~$OHB_report.xlsx", Path::new("~$OHB_report.xlsx")));
        assert!(!is_loadable_export("Open PO.pdf", Path::new("Open PO.pdf")));
        assert!(!is_loadable_export("min_max", Path::new("min_max")));
    }

    #[test]
    fn categories_are_listed_in_collection_order() {
        let mut sorted = BatchCategory::ALL;
        sorted.sort();
        assert_eq!(sorted, BatchCategory::ALL);
    }
}
