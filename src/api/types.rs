use serde::{Deserialize, Serialize};
use crate::analysis::YearRange;
use crate::models::{GrowthMap, Metric, RecordFilter, RegressionDiagnostics, RegressionResult};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub records: usize,
}

/// Splits a comma-separated borough list, dropping blanks.
pub fn parse_boroughs(raw: Option<&str>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub year: Option<i32>,
    /// Comma-separated borough names.
    pub boroughs: Option<String>,
}

impl SummaryQuery {
    pub fn filter(&self) -> RecordFilter {
        RecordFilter {
            year: self.year,
            boroughs: parse_boroughs(self.boroughs.as_deref()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricQuery {
    pub metric: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BoroughsQuery {
    pub boroughs: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GrowthResponse {
    pub metric: Metric,
    pub growth: GrowthMap,
}

#[derive(Debug, Serialize)]
pub struct RegressionResponse {
    pub regression: Option<RegressionResult>,
    pub diagnostics: Option<RegressionDiagnostics>,
}

#[derive(Debug, Serialize)]
pub struct BoroughInfo {
    pub name: String,
    pub population: Option<u64>,
    pub area_sq_mi: Option<f64>,
    pub note: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct YearsResponse {
    pub years: Vec<i32>,
    pub range: Option<YearRange>,
}
