use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::str::FromStr;
use ordered_float::OrderedFloat;
use serde::Serialize;
use serde_json::{json, Value};
use crate::analysis::grouping::{filter_records, group_by_borough, latest_year_snapshot, unique_boroughs, unique_years};
use crate::analysis::growth::borough_year_over_year;
use crate::models::{BoroughYearChange, Metric, Record, RecordFilter, RegressionDiagnostics, Summary, YearOverYearMap};

/// Cell source for [`heatmap_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatmapMetric {
    MedianRent,
    /// Year-over-year rent change in percent, rounded to one decimal.
    RentGrowth,
    Field(Metric),
}

impl FromStr for HeatmapMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "median_rent" => Ok(HeatmapMetric::MedianRent),
            "rent_growth" => Ok(HeatmapMetric::RentGrowth),
            other => Metric::from_str(other).map(HeatmapMetric::Field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapData {
    pub years: Vec<i32>,
    pub boroughs: Vec<String>,
    /// One row per borough, one column per year.
    pub matrix: Vec<Vec<Option<f64>>>,
}

/// Boroughs × years grid of a metric. Cells without a record are `None`; growth cells
/// without a matching change are `0`.
pub fn heatmap_data(records: &[Record], metric: HeatmapMetric, yoy: Option<&YearOverYearMap>) -> HeatmapData {
    let years = unique_years(records);
    let boroughs = unique_boroughs(records);
    let matrix = boroughs
        .iter()
        .map(|borough| {
            years
                .iter()
                .map(|&year| {
                    let row = records.iter().find(|r| r.year == year && &r.borough == borough)?;
                    match metric {
                        HeatmapMetric::MedianRent => Some(row.median_rent),
                        HeatmapMetric::RentGrowth => {
                            let changes = yoy?.get(borough)?;
                            Some(
                                changes
                                    .iter()
                                    .find(|entry| entry.year == year)
                                    .map(|entry| (entry.pct * 10.0).round() / 10.0)
                                    .unwrap_or(0.0),
                            )
                        }
                        HeatmapMetric::Field(field) => row.metric(field),
                    }
                })
                .collect()
        })
        .collect();

    HeatmapData { years, boroughs, matrix }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBorough {
    pub rank: usize,
    pub borough: String,
    pub median_rent: f64,
    pub median_income: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestMetrics {
    pub rank: Vec<RankedBorough>,
    pub average_income: Option<f64>,
    pub average_rent: Option<f64>,
}

/// Rent ranking and averages for one year, optionally restricted to some boroughs.
pub fn latest_metrics(records: &[Record], year: i32, boroughs: &[String]) -> LatestMetrics {
    let mut rows = filter_records(records, &RecordFilter { year: Some(year), boroughs: boroughs.to_vec() });
    rows.sort_by_key(|r| Reverse(OrderedFloat(r.median_rent)));

    let count = rows.len() as f64;
    let average = |value: fn(&Record) -> f64| {
        (!rows.is_empty()).then(|| rows.iter().map(value).sum::<f64>() / count)
    };

    LatestMetrics {
        average_income: average(|r| r.median_income),
        average_rent: average(|r| r.median_rent),
        rank: rows
            .iter()
            .enumerate()
            .map(|(index, row)| RankedBorough {
                rank: index + 1,
                borough: row.borough.clone(),
                median_rent: row.median_rent,
                median_income: row.median_income,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub borough: String,
    pub year: i32,
    pub subway: Option<f64>,
    pub air_quality: Option<f64>,
}

/// Income against rent, with the marker radius scaled by subway access (minimum 4).
pub fn compile_scatter(records: &[Record], boroughs: &[String]) -> Vec<ScatterPoint> {
    filter_records(records, &RecordFilter { year: None, boroughs: boroughs.to_vec() })
        .into_iter()
        .map(|row| ScatterPoint {
            x: row.median_income,
            y: row.median_rent,
            r: row.subway_access_score.map_or(4.0, |s| (s / 4.0).max(4.0)),
            borough: row.borough,
            year: row.year,
            subway: row.subway_access_score,
            air_quality: row.air_quality_index,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoroughSeries {
    pub year: Vec<i32>,
    pub median_rent: Vec<f64>,
    pub median_income: Vec<f64>,
    pub subway_access_score: Vec<Option<f64>>,
    pub air_quality_index: Vec<Option<f64>>,
}

/// Pre-aggregated series for the front-end charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VizPayload {
    pub generated_at: String,
    pub boroughs: Vec<String>,
    pub years: Vec<i32>,
    pub series: BTreeMap<String, BoroughSeries>,
    pub scatter: Vec<ScatterPoint>,
    pub heatmap: HeatmapData,
    pub latest_snapshot: Vec<Record>,
    pub yoy: BTreeMap<String, Vec<BoroughYearChange>>,
}

pub fn build_viz_payload(records: &[Record], generated_at: &str) -> VizPayload {
    let boroughs = unique_boroughs(records);
    let years = unique_years(records);
    let yoy = borough_year_over_year(records);

    let series = group_by_borough(records)
        .into_iter()
        .map(|(borough, mut rows)| {
            rows.sort_by_key(|r| r.year);
            let series = BoroughSeries {
                year: rows.iter().map(|r| r.year).collect(),
                median_rent: rows.iter().map(|r| r.median_rent).collect(),
                median_income: rows.iter().map(|r| r.median_income).collect(),
                subway_access_score: rows.iter().map(|r| r.subway_access_score).collect(),
                air_quality_index: rows.iter().map(|r| r.air_quality_index).collect(),
            };
            (borough, series)
        })
        .collect();

    let matrix = boroughs
        .iter()
        .map(|borough| {
            let changes = yoy.get(borough);
            years
                .iter()
                .map(|&year| {
                    changes?
                        .iter()
                        .find(|change| change.year == year)
                        .and_then(|change| change.pct)
                })
                .collect()
        })
        .collect();

    VizPayload {
        generated_at: generated_at.to_string(),
        heatmap: HeatmapData { years: years.clone(), boroughs: boroughs.clone(), matrix },
        boroughs,
        years,
        series,
        scatter: compile_scatter(records, &[]),
        latest_snapshot: latest_year_snapshot(records),
        yoy,
    }
}

/// Overlays a computed summary onto a base JSON object (usually a previously published
/// summary). Non-object bases are replaced.
pub fn build_summary_payload(
    base: &Value,
    summary: &Summary,
    diagnostics: Option<&RegressionDiagnostics>,
    generated_at: &str,
) -> Value {
    let mut payload = match base {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };

    let regression = match (&summary.regression, diagnostics) {
        (Some(regression), Some(diagnostics)) => {
            let mut merged = json!(regression);
            if let (Value::Object(target), Value::Object(extra)) = (&mut merged, json!(diagnostics)) {
                target.extend(extra);
            }
            merged
        }
        (Some(regression), None) => json!(regression),
        (None, _) => Value::Null,
    };

    payload.insert("generated_at".to_string(), json!(generated_at));
    payload.insert("latest_year".to_string(), json!(summary.latest_year));
    payload.insert("rent_growth".to_string(), json!(summary.growth));
    payload.insert("income_growth".to_string(), json!(summary.income_growth));
    payload.insert("yoy".to_string(), json!(summary.yoy));
    payload.insert("latest_rows".to_string(), json!(summary.latest_rows));
    payload.insert("correlations".to_string(), json!(summary.correlations));
    payload.insert("regression".to_string(), regression);
    payload.insert("disparity_index".to_string(), json!(summary.disparity));
    payload.insert("headlines".to_string(), json!(summary.headlines));
    Value::Object(payload)
}
