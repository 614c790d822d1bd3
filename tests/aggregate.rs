use materials_tools::ToolError;
use materials_tools::aggregate::{self, COUNT_QTY, PART_DESC, TXN_QTY};
use materials_tools::model::{Cell, ReportType, Table};

const PRODUCTION_COLUMNS: [&str; 8] = [
    "PART_NBR",
    "BIN_ID",
    "USER NAME",
    "TXN_DATE",
    "SUB CODE",
    "TXN_QTY",
    "APPLICATION",
    "WAREHOUSE",
];

const BIN_COUNT_COLUMNS: [&str; 11] = [
    "FACILITY_ID",
    "BIN_SOURCE",
    "BUILDING",
    "BIN_ID",
    "PART_NBR",
    "PART_DESC",
    "SYSTEM_QTY",
    "COUNT_QTY",
    "DELTA",
    "COUNT_DATE",
    "COUNTED_BY",
];

fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
    let mut table = Table::new(columns.iter().copied());
    for row in rows {
        table.push_row(row.iter().map(|value| Cell::from(*value)).collect());
    }
    table
}

fn column(table: &Table, name: &str) -> Vec<Cell> {
    let index = table.column_index(name).expect("column present");
    table.column_values(index).cloned().collect()
}

fn total(table: &Table, name: &str) -> f64 {
    column(table, name)
        .iter()
        .filter_map(Cell::as_number)
        .sum()
}

fn production_rows() -> Table {
    table(
        &PRODUCTION_COLUMNS,
        &[
            &["A1", "B1", "jdoe", "1/2/2024 10:15:00 AM", "S1", "3", "PICKING", "W1"],
            &["A1", "B1", "jdoe", "1/2/2024 10:15:42 AM", "S1", "5", "PICKING", "W2"],
            &["A2", "B1", "jdoe", "1/2/2024 10:15:00 AM", "S1", "4", "PICKING", "W1"],
            &["A1", "B1", "asmith", "1/2/2024 10:15:00 AM", "S1", "2", "PICKING", "W1"],
            &["A1", "B1", "jdoe", "1/2/2024 10:16:00 AM", "S1", "1", "PICKING", "W1"],
            &["A1", "B1", "jdoe", "1/2/2024 10:15:00 AM", "S1", "9", "PUTAWAY", "W1"],
            &["A3", "B7", "jdoe", "1/2/2024 02:30:00 PM", "S2", "6", "RECEIVING", "W1"],
        ],
    )
}

#[test]
fn duplicate_picks_are_summed() {
    let input = table(
        &PRODUCTION_COLUMNS,
        &[
            &["A1", "B1", "jdoe", "1/2/2024 10:15:00 AM", "S1", "3", "PICKING", "W1"],
            &["A1", "B1", "jdoe", "1/2/2024 10:15:00 AM", "S1", "5", "PICKING", "W1"],
        ],
    );

    let report = aggregate::aggregate(&input, ReportType::Production).expect("aggregated");

    assert_eq!(report.report_type, ReportType::Production);
    assert_eq!(report.table.len(), 1);
    assert_eq!(column(&report.table, TXN_QTY), vec![Cell::Number(8.0)]);
    assert_eq!(
        report.headers,
        &["PART_NBR", "BIN_ID", "TXN_QTY", "USER NAME", "TXN_DATE", "SUB CODE"]
    );
    assert_eq!(
        report.table.columns,
        vec!["PART_NBR", "BIN_ID", "TXN_QTY", "USER_NAME", "TXN_DATE", "SUB_CODE"]
    );
}

#[test]
fn production_output_keeps_first_member_fields() {
    let report = aggregate::aggregate(&production_rows(), ReportType::Production)
        .expect("aggregated");

    // Keys: (A1,B1,asmith,10:15), (A1,B1,jdoe,10:15), (A1,B1,jdoe,10:16), (A2,B1,jdoe,10:15)
    assert_eq!(report.table.len(), 4);
    let jdoe = report
        .table
        .rows
        .iter()
        .find(|row| {
            row[0] == Cell::Text("A1".into())
                && row[3] == Cell::Text("jdoe".into())
                && row[2] == Cell::Number(8.0)
        })
        .expect("merged jdoe row");
    assert_eq!(jdoe[4].to_string(), "1/2/2024 10:15");
    assert_eq!(jdoe[5], Cell::Text("S1".into()));
}

#[test]
fn production_row_count_and_quantity_are_bounded_by_picking_rows() {
    let input = production_rows();
    let picking = Table {
        columns: input.columns.clone(),
        rows: input
            .rows
            .iter()
            .filter(|row| row[6] == Cell::Text("PICKING".into()))
            .cloned()
            .collect(),
    };

    let report = aggregate::aggregate(&input, ReportType::Production).expect("aggregated");

    assert!(report.table.len() <= picking.len());
    assert_eq!(total(&report.table, TXN_QTY), total(&picking, TXN_QTY));
    assert_eq!(total(&report.table, TXN_QTY), 15.0);
}

#[test]
fn unique_keys_keep_every_row() {
    let input = table(
        &PRODUCTION_COLUMNS,
        &[
            &["A1", "B1", "jdoe", "1/2/2024 10:15:00 AM", "S1", "3", "PICKING", "W1"],
            &["A1", "B1", "jdoe", "1/2/2024 11:15:00 AM", "S1", "3", "PICKING", "W1"],
            &["A1", "B1", "jdoe", "1/2/2024 10:15:00 AM", "S2", "3", "PICKING", "W1"],
        ],
    );

    let report = aggregate::aggregate(&input, ReportType::Production).expect("aggregated");
    assert_eq!(report.table.len(), 3);
}

#[test]
fn concatenation_collisions_stay_separate() {
    let input = table(
        &PRODUCTION_COLUMNS,
        &[
            &["A1", "23", "jdoe", "1/2/2024 10:15:00 AM", "S1", "3", "PICKING", "W1"],
            &["A12", "3", "jdoe", "1/2/2024 10:15:00 AM", "S1", "5", "PICKING", "W1"],
        ],
    );

    let report = aggregate::aggregate(&input, ReportType::Production).expect("aggregated");
    assert_eq!(report.table.len(), 2);
}

#[test]
fn aggregating_output_again_changes_nothing() {
    let first = aggregate::aggregate(&production_rows(), ReportType::Production)
        .expect("aggregated");

    let mut again_input = first.table.clone();
    again_input.columns.push("APPLICATION".into());
    for row in &mut again_input.rows {
        row.push(Cell::Text("PICKING".into()));
    }
    let second = aggregate::aggregate(&again_input, ReportType::Production)
        .expect("aggregated again");
    assert_eq!(first.table, second.table);

    let bins = bin_count_rows();
    let first = aggregate::aggregate(&bins, ReportType::BinCount).expect("aggregated");
    let second = aggregate::aggregate(&first.table, ReportType::BinCount)
        .expect("aggregated again");
    assert_eq!(first.table, second.table);
}

#[test]
fn underscored_column_spellings_are_accepted() {
    let columns = [
        "PART_NBR",
        "BIN_ID",
        "USER_NAME",
        "TXN_DATE",
        "SUB_CODE",
        "TXN_QTY",
        "APPLICATION",
    ];
    let input = table(
        &columns,
        &[&["A1", "B1", "jdoe", "1/2/2024 10:15:00 AM", "S1", "2", "PICKING"]],
    );

    let report = aggregate::aggregate_detected(&input).expect("aggregated");
    assert_eq!(report.report_type, ReportType::Production);
    assert_eq!(report.table.len(), 1);
}

#[test]
fn malformed_transaction_date_fails() {
    let input = table(
        &PRODUCTION_COLUMNS,
        &[
            &["A1", "B1", "jdoe", "1/2/2024 10:15:00 AM", "S1", "3", "PICKING", "W1"],
            &["A1", "B1", "jdoe", "2024-01-02 10:15", "S1", "5", "PICKING", "W1"],
        ],
    );

    match aggregate::aggregate(&input, ReportType::Production) {
        Err(ToolError::MalformedTimestamp { column, row, value }) => {
            assert_eq!(column, "TXN_DATE");
            assert_eq!(row, 3);
            assert_eq!(value, "2024-01-02 10:15");
        }
        other => panic!("expected malformed timestamp, got {other:?}"),
    }
}

#[test]
fn non_numeric_quantity_fails() {
    let input = table(
        &PRODUCTION_COLUMNS,
        &[&["A1", "B1", "jdoe", "1/2/2024 10:15:00 AM", "S1", "lots", "PICKING", "W1"]],
    );

    let error = aggregate::aggregate(&input, ReportType::Production).expect_err("must fail");
    assert!(matches!(error, ToolError::InvalidQuantity { .. }));
}

#[test]
fn missing_required_column_is_reported() {
    let input = table(
        &["PART_NBR", "BIN_ID", "TXN_DATE", "TXN_QTY", "APPLICATION"],
        &[&["A1", "B1", "1/2/2024 10:15:00 AM", "3", "PICKING"]],
    );

    match aggregate::aggregate(&input, ReportType::Production) {
        Err(ToolError::MissingColumn { column, .. }) => assert_eq!(column, "USER_NAME"),
        other => panic!("expected missing column, got {other:?}"),
    }
}

#[test]
fn unmarked_table_is_unrecognized() {
    let input = table(&["SKU", "QTY"], &[&["A1", "3"]]);

    let error = aggregate::aggregate_detected(&input).expect_err("must fail");
    assert!(matches!(error, ToolError::UnrecognizedReportType { .. }));
    assert!(error.to_string().contains("SKU, QTY"));
}

#[test]
fn report_type_is_detected_from_columns() {
    assert_eq!(
        aggregate::classify(&production_rows()).expect("classified"),
        ReportType::Production
    );
    assert_eq!(
        aggregate::classify(&bin_count_rows()).expect("classified"),
        ReportType::BinCount
    );
    let marked = Table::new(["Bin", "FACILITY_ID"]);
    assert_eq!(aggregate::classify(&marked).expect("classified"), ReportType::BinCount);
}

fn bin_count_rows() -> Table {
    table(
        &BIN_COUNT_COLUMNS,
        &[
            &["F1", "MAIN", "B12", "BIN-7", "P100", "Widget", "10", "9", "-1", "1/2/2024 10:15:40 AM", "kim"],
            &["F1", "MAIN", "B12", "BIN-7", "P100", "Widget (recount)", "10", "10", "0", "1/2/2024 10:15:55 AM", "kim"],
            &["F1", "MAIN", "B12", "BIN-7", "P100", "Widget", "10", "7", "-3", "1/2/2024 10:15:05 AM", "kim"],
            &["F1", "MAIN", "B12", "BIN-7", "P100", "Widget", "10", "8", "-2", "1/3/2024 10:15:05 AM", "kim"],
            &["F1", "MAIN", "B12", "BIN-9", "P200", "Gadget", "4", "4", "0", "1/2/2024 09:00:00 AM", "lee"],
        ],
    )
}

#[test]
fn latest_bin_count_wins_within_a_day() {
    let report = aggregate::aggregate(&bin_count_rows(), ReportType::BinCount)
        .expect("aggregated");

    assert_eq!(report.table.len(), 3);
    assert_eq!(report.headers, report.table.columns.as_slice());
    let same_day = report
        .table
        .rows
        .iter()
        .find(|row| row[3] == Cell::Text("BIN-7".into()) && row[9].to_string() == "1/2/2024 10:15")
        .expect("BIN-7 counted on the 2nd");
    let desc = report.table.column_index(PART_DESC).expect("desc column");
    let qty = report.table.column_index(COUNT_QTY).expect("qty column");
    assert_eq!(same_day[qty], Cell::Number(10.0));
    assert_eq!(same_day[desc], Cell::Text("Widget (recount)".into()));
}

#[test]
fn bin_count_result_ignores_input_order() {
    let forward = bin_count_rows();
    let mut reversed = forward.clone();
    reversed.rows.reverse();

    let forward = aggregate::aggregate(&forward, ReportType::BinCount).expect("aggregated");
    let reversed = aggregate::aggregate(&reversed, ReportType::BinCount).expect("aggregated");
    assert_eq!(forward.table, reversed.table);
}

#[test]
fn equal_count_times_resolve_to_the_later_input_row() {
    let first: &[&str] = &["F1", "MAIN", "B12", "BIN-7", "P100", "Widget", "10", "6", "-4", "1/2/2024 10:15:30 AM", "kim"];
    let second: &[&str] = &["F1", "MAIN", "B12", "BIN-7", "P100", "Widget", "10", "11", "1", "1/2/2024 10:15:30 AM", "kim"];

    let forward = table(&BIN_COUNT_COLUMNS, &[first, second]);
    let report = aggregate::aggregate(&forward, ReportType::BinCount).expect("aggregated");
    assert_eq!(report.table.len(), 1);
    assert_eq!(column(&report.table, COUNT_QTY), vec![Cell::Number(11.0)]);

    let swapped = table(&BIN_COUNT_COLUMNS, &[second, first]);
    let report = aggregate::aggregate(&swapped, ReportType::BinCount).expect("aggregated");
    assert_eq!(report.table.len(), 1);
    assert_eq!(column(&report.table, COUNT_QTY), vec![Cell::Number(6.0)]);
}

#[test]
fn counts_in_different_minutes_or_days_stay_separate() {
    let input = table(
        &BIN_COUNT_COLUMNS,
        &[
            &["F1", "MAIN", "B12", "BIN-7", "P100", "Widget", "10", "9", "-1", "1/2/2024 10:15:00 AM", "kim"],
            &["F1", "MAIN", "B12", "BIN-7", "P100", "Widget", "10", "10", "0", "1/2/2024 11:15:00 AM", "kim"],
            &["F1", "MAIN", "B12", "BIN-7", "P100", "Widget", "10", "8", "-2", "1/3/2024 10:15:00 AM", "kim"],
        ],
    );

    let report = aggregate::aggregate(&input, ReportType::BinCount).expect("aggregated");
    assert_eq!(report.table.len(), 3);
    assert_eq!(total(&report.table, COUNT_QTY), 27.0);
}

#[test]
fn malformed_count_date_fails() {
    let input = table(
        &BIN_COUNT_COLUMNS,
        &[&["F1", "MAIN", "B12", "BIN-7", "P100", "Widget", "10", "9", "-1", "yesterday", "kim"]],
    );

    let error = aggregate::aggregate(&input, ReportType::BinCount).expect_err("must fail");
    assert!(matches!(error, ToolError::MalformedTimestamp { row: 2, .. }));
}
