use std::collections::BTreeMap;
use crate::analysis::grouping::{group_by_borough, unique_years};
use crate::models::{
    BoroughYearChange, DisparityMap, DisparitySnapshot, GrowthEntry, GrowthMap, Metric, Record,
    YearOverYearEntry, YearOverYearMap,
};

/// Change of `metric` per borough between the earliest and latest year of the whole input.
///
/// Boroughs without a row for either endpoint year, or without a value for the metric on
/// either row, are omitted. A zero start value yields `pct == 0`.
pub fn calculate_growth(records: &[Record], metric: Metric) -> GrowthMap {
    growth_between_endpoints(records, |start, end| {
        let start_value = start.metric(metric)?;
        let end_value = end.metric(metric)?;
        let absolute = end_value - start_value;
        let pct = if start_value == 0.0 { 0.0 } else { absolute / start_value * 100.0 };
        Some((start_value, end_value, absolute, pct))
    })
}

/// Rent-only growth. Unlike [`calculate_growth`] the percentage is not guarded against a zero
/// start rent.
pub fn calculate_rent_growth(records: &[Record]) -> GrowthMap {
    growth_between_endpoints(records, |start, end| {
        let absolute = end.median_rent - start.median_rent;
        let pct = absolute / start.median_rent * 100.0;
        Some((start.median_rent, end.median_rent, absolute, pct))
    })
}

fn growth_between_endpoints<F>(records: &[Record], measure: F) -> GrowthMap
where
    F: Fn(&Record, &Record) -> Option<(f64, f64, f64, f64)>,
{
    let years = unique_years(records);
    let mut result = GrowthMap::new();
    let (Some(&start_year), Some(&end_year)) = (years.first(), years.last()) else {
        return result;
    };

    for (borough, rows) in group_by_borough(records) {
        let start = rows.iter().find(|r| r.year == start_year);
        let end = rows.iter().find(|r| r.year == end_year);
        let (Some(start), Some(end)) = (start, end) else {
            continue;
        };
        let Some((start_value, end_value, absolute, pct)) = measure(start, end) else {
            continue;
        };
        result.insert(borough, GrowthEntry {
            start_year,
            end_year,
            start_value,
            end_value,
            absolute,
            pct,
        });
    }
    result
}

/// Rent deltas between adjacent records after sorting by year, then rent.
///
/// A pair only produces an entry when both records share a borough. The percentage has no
/// zero guard.
pub fn calculate_year_over_year(records: &[Record]) -> YearOverYearMap {
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| a.median_rent.total_cmp(&b.median_rent))
    });

    let mut yoy = YearOverYearMap::new();
    for pair in sorted.windows(2) {
        let (prev, current) = (pair[0], pair[1]);
        if current.borough != prev.borough {
            continue;
        }
        let change = current.median_rent - prev.median_rent;
        yoy.entry(current.borough.clone())
            .or_default()
            .push(YearOverYearEntry {
                year: current.year,
                change,
                pct: change / prev.median_rent * 100.0,
            });
    }
    yoy
}

/// Per-borough, year-sorted rent series with the change from the previous year.
pub fn borough_year_over_year(records: &[Record]) -> BTreeMap<String, Vec<BoroughYearChange>> {
    group_by_borough(records)
        .into_iter()
        .map(|(borough, mut rows)| {
            rows.sort_by_key(|r| r.year);
            let mut prior: Option<f64> = None;
            let changes = rows
                .iter()
                .map(|row| {
                    let pct = prior
                        .filter(|p| *p != 0.0)
                        .map(|p| (row.median_rent - p) / p * 100.0);
                    prior = Some(row.median_rent);
                    BoroughYearChange { year: row.year, rent: row.median_rent, pct }
                })
                .collect();
            (borough, changes)
        })
        .collect()
}

/// Max, min and spread of median rent across the boroughs present in each year.
pub fn calculate_disparity(records: &[Record]) -> DisparityMap {
    unique_years(records)
        .into_iter()
        .map(|year| {
            let (max, min) = records
                .iter()
                .filter(|r| r.year == year)
                .fold((f64::NEG_INFINITY, f64::INFINITY), |(max, min), r| {
                    (max.max(r.median_rent), min.min(r.median_rent))
                });
            (year, DisparitySnapshot { max, min, spread: max - min })
        })
        .collect()
}
