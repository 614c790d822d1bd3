use chrono::{NaiveDate, NaiveDateTime, Timelike};

/// Separator used when an identity key is rendered as a single serial string.
/// Export fields never contain control characters, so rendered serials cannot
/// collide the way plain concatenation does (`A1`+`23` vs `A12`+`3`).
pub const SERIAL_SEPARATOR: char = '\u{1f}';

/// Truncates a timestamp to the start of its minute.
pub fn truncate_to_minute(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .with_second(0)
        .and_then(|value| value.with_nanosecond(0))
        .unwrap_or(timestamp)
}

/// Identity of a production picking transaction.
///
/// Two picks of the same part from the same bin, by the same user, under the
/// same sub code within the same minute are one logical transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductionKey {
    pub part_number: String,
    pub bin_id: String,
    pub user_name: String,
    pub minute: NaiveDateTime,
    pub sub_code: String,
}

impl ProductionKey {
    /// Builds the key, truncating `timestamp` to its minute.
    pub fn new(
        part_number: String,
        bin_id: String,
        user_name: String,
        timestamp: NaiveDateTime,
        sub_code: String,
    ) -> Self {
        Self {
            part_number,
            bin_id,
            user_name,
            minute: truncate_to_minute(timestamp),
            sub_code,
        }
    }

    /// Renders the key as separator-joined text for logs.
    pub fn serial(&self) -> String {
        join_serial(&[
            &self.part_number,
            &self.bin_id,
            &self.user_name,
            &minute_stamp(self.minute),
            &self.sub_code,
        ])
    }
}

/// Identity of a bin count, scoped to the calendar day it was taken on.
///
/// Field order matters: it drives the output ordering of aggregated rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BinCountKey {
    pub facility_id: String,
    pub bin_source: String,
    pub building: String,
    pub bin_id: String,
    pub part_number: String,
    pub system_qty: String,
    pub minute: NaiveDateTime,
    pub counted_by: String,
    pub count_day: NaiveDate,
}

impl BinCountKey {
    /// Renders the key as separator-joined text for logs.
    pub fn serial(&self) -> String {
        join_serial(&[
            &self.facility_id,
            &self.bin_source,
            &self.building,
            &self.bin_id,
            &self.part_number,
            &self.system_qty,
            &minute_stamp(self.minute),
            &self.counted_by,
        ])
    }
}

fn minute_stamp(minute: NaiveDateTime) -> String {
    minute.format("%Y%m%d%H%M").to_string()
}

fn join_serial(parts: &[&str]) -> String {
    let mut serial = String::new();
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            serial.push(SERIAL_SEPARATOR);
        }
        serial.push_str(part);
    }
    serial
}
