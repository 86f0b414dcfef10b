use std::cmp::Reverse;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::Serialize;
use crate::models::{Record, RecordFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

/// Distinct years in ascending order.
pub fn unique_years(records: &[Record]) -> Vec<i32> {
    records.iter().map(|r| r.year).unique().sorted().collect()
}

/// Distinct borough names in lexicographic order.
pub fn unique_boroughs(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.borough.clone()).unique().sorted().collect()
}

/// Keeps records matching the filter. A year of `0` matches every year, like an absent one.
pub fn filter_records(records: &[Record], filter: &RecordFilter) -> Vec<Record> {
    records
        .iter()
        .filter(|row| {
            let year_match = match filter.year {
                Some(year) if year != 0 => row.year == year,
                _ => true,
            };
            let borough_match = filter.boroughs.is_empty() || filter.boroughs.contains(&row.borough);
            year_match && borough_match
        })
        .cloned()
        .collect()
}

/// Groups records by borough. Groups appear in order of first occurrence and keep the input
/// order of their rows.
pub fn group_by_borough(records: &[Record]) -> Vec<(String, Vec<Record>)> {
    let mut groups: Vec<(String, Vec<Record>)> = Vec::new();
    for row in records {
        match groups.iter_mut().find(|(borough, _)| *borough == row.borough) {
            Some((_, rows)) => rows.push(row.clone()),
            None => groups.push((row.borough.clone(), vec![row.clone()])),
        }
    }
    groups
}

pub fn latest_year(records: &[Record]) -> Option<i32> {
    records.iter().map(|r| r.year).max()
}

/// Rows of the latest year, highest rent first.
pub fn latest_year_snapshot(records: &[Record]) -> Vec<Record> {
    let Some(year) = latest_year(records) else {
        return Vec::new();
    };
    let mut rows = filter_records(records, &RecordFilter::year(year));
    rows.sort_by_key(|r| Reverse(OrderedFloat(r.median_rent)));
    rows
}

/// Records belonging to the `size` most recent distinct years.
pub fn latest_window(records: &[Record], size: usize) -> Vec<Record> {
    let years = unique_years(records);
    let window_years = &years[years.len().saturating_sub(size)..];
    records
        .iter()
        .filter(|row| window_years.contains(&row.year))
        .cloned()
        .collect()
}

pub fn year_range(records: &[Record]) -> Option<YearRange> {
    let years = unique_years(records);
    Some(YearRange {
        min: *years.first()?,
        max: *years.last()?,
    })
}

pub fn aggregate_for_year(records: &[Record], year: i32) -> Vec<Record> {
    filter_records(records, &RecordFilter::year(year))
}
