use tracing::debug;
use crate::models::{RawRow, Record};

/// Normalizes raw rows into typed records, silently dropping rows that fail validation.
///
/// Never fails: malformed input degrades to a partial or empty set.
pub fn clean_records(rows: &[RawRow]) -> Vec<Record> {
    let mut rejected = 0usize;
    let records: Vec<Record> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| match Record::try_from(row) {
            Ok(record) => Some(record),
            Err(reason) => {
                rejected += 1;
                debug!("Dropping row {}: {}", index, reason);
                None
            }
        })
        .collect();

    if rejected > 0 {
        debug!("Cleaned {} rows: kept {}, rejected {}", rows.len(), records.len(), rejected);
    }
    records
}
