use std::collections::{BTreeMap, BTreeSet};
use serde::Serialize;
use tracing::{error, info, warn};
use crate::constants::{EXPECTED_COLUMNS, INCOME_BOUNDS, RENT_BOUNDS};
use crate::models::{RawRow, Record};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundViolation {
    pub borough: String,
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateKey {
    pub borough: String,
    pub year: i32,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub missing_columns: Vec<String>,
    pub rent_out_of_bounds: Vec<BoundViolation>,
    pub income_out_of_bounds: Vec<BoundViolation>,
    pub duplicates: Vec<DuplicateKey>,
    /// Raw rows that did not survive cleaning. Informational only.
    pub rejected_rows: usize,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.missing_columns.is_empty()
            && self.rent_out_of_bounds.is_empty()
            && self.income_out_of_bounds.is_empty()
            && self.duplicates.is_empty()
    }
}

/// Schema and range checks for a loaded dataset.
pub struct Validator {
    rent_bounds: (f64, f64),
    income_bounds: (f64, f64),
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(RENT_BOUNDS, INCOME_BOUNDS)
    }
}

impl Validator {
    pub fn new(rent_bounds: (f64, f64), income_bounds: (f64, f64)) -> Self {
        Self { rent_bounds, income_bounds }
    }

    /// Checks raw rows for the expected columns and cleaned records for sanity bounds and
    /// duplicate borough-year combinations.
    pub fn validate(&self, rows: &[RawRow], records: &[Record]) -> ValidationReport {
        let columns: BTreeSet<&str> = rows
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        let missing_columns = EXPECTED_COLUMNS
            .iter()
            .filter(|column| !columns.contains(**column))
            .map(|column| column.to_string())
            .collect();

        let out_of_bounds = |value: fn(&Record) -> f64, (low, high): (f64, f64)| {
            records
                .iter()
                .filter(|r| {
                    let v = value(r);
                    v < low || v > high
                })
                .map(|r| BoundViolation { borough: r.borough.clone(), year: r.year, value: value(r) })
                .collect::<Vec<_>>()
        };

        let mut counts: BTreeMap<(&str, i32), usize> = BTreeMap::new();
        for r in records {
            *counts.entry((r.borough.as_str(), r.year)).or_insert(0) += 1;
        }
        let duplicates = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|((borough, year), count)| DuplicateKey { borough: borough.to_string(), year, count })
            .collect();

        let report = ValidationReport {
            missing_columns,
            rent_out_of_bounds: out_of_bounds(|r| r.median_rent, self.rent_bounds),
            income_out_of_bounds: out_of_bounds(|r| r.median_income, self.income_bounds),
            duplicates,
            rejected_rows: rows.len().saturating_sub(records.len()),
        };
        self.log_validation_results(&report);
        report
    }

    fn log_validation_results(&self, report: &ValidationReport) {
        if !report.missing_columns.is_empty() {
            error!("Missing expected columns: {:?}", report.missing_columns);
        }
        for violation in &report.rent_out_of_bounds {
            error!(
                "median_rent outside sanity bounds for {} {}: {} (allowed {}-{})",
                violation.borough, violation.year, violation.value, self.rent_bounds.0, self.rent_bounds.1
            );
        }
        for violation in &report.income_out_of_bounds {
            error!(
                "median_income outside sanity bounds for {} {}: {} (allowed {}-{})",
                violation.borough, violation.year, violation.value, self.income_bounds.0, self.income_bounds.1
            );
        }
        for duplicate in &report.duplicates {
            error!(
                "Duplicate borough-year combination {} {} ({} rows)",
                duplicate.borough, duplicate.year, duplicate.count
            );
        }
        if report.rejected_rows > 0 {
            warn!("{} rows were dropped during cleaning", report.rejected_rows);
        }
        if report.is_ok() {
            info!("Basic checks OK");
        }
    }
}
