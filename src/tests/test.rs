pub use crate::*;

#[cfg(test)]
pub mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::Json;
    use rand::prelude::*;
    use rand_distr::{Distribution, Normal, Uniform};
    use serde_json::{json, Value};
    use statrs::statistics::Statistics;
    use std::sync::Arc;

    // Helper function for relative error calculation
    fn relative_error(computed: f64, expected: f64) -> f64 {
        if expected == 0.0 {
            computed.abs()
        } else {
            ((computed - expected) / expected).abs()
        }
    }

    fn record(year: i32, borough: &str, rent: f64, income: f64) -> Record {
        Record {
            year,
            borough: borough.to_string(),
            median_rent: rent,
            median_income: income,
            subway_access_score: None,
            air_quality_index: None,
        }
    }

    fn full_record(year: i32, borough: &str, rent: f64, income: f64, subway: f64, air: f64) -> Record {
        Record {
            subway_access_score: Some(subway),
            air_quality_index: Some(air),
            ..record(year, borough, rent, income)
        }
    }

    fn raw(value: Value) -> RawRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    /// Records whose rent is an exact linear function of the model predictors.
    fn generate_linear_records(size: usize, seed: u64) -> Vec<Record> {
        let mut rng = StdRng::seed_from_u64(seed);
        let income = Uniform::new(20.0, 80.0);
        let subway = Uniform::new(40.0, 95.0);
        let air = Uniform::new(30.0, 60.0);

        (0..size)
            .map(|i| {
                let x1 = income.sample(&mut rng);
                let x2 = subway.sample(&mut rng);
                let aqi = air.sample(&mut rng);
                let rent = 5.0 + 2.0 * x1 + 3.0 * x2 + 1.0 * (100.0 - aqi);
                full_record(2000 + (i % 10) as i32, &format!("B{}", i % 5), rent, x1, x2, aqi)
            })
            .collect()
    }

    fn embedded_state() -> Arc<AppState> {
        Arc::new(AppState::new(embedded_data().records))
    }

    #[test]
    fn test_to_number_coercion() {
        assert_eq!(to_number(&json!(" 42.5 ")), Some(42.5));
        assert_eq!(to_number(&json!(7)), Some(7.0));
        assert_eq!(to_number(&json!(true)), Some(1.0));
        assert_eq!(to_number(&json!(false)), Some(0.0));
        assert_eq!(to_number(&json!("")), None);
        assert_eq!(to_number(&json!("abc")), None);
        assert_eq!(to_number(&json!("NaN")), None);
        assert_eq!(to_number(&Value::Null), None);
        assert_eq!(to_number(&json!([1])), None);
    }

    #[test]
    fn test_clean_records_rejects_invalid_rows() {
        let rows = vec![
            raw(json!({"year": "2020", "borough": "Bronx", "median_rent": "1500", "median_income": "40000"})),
            raw(json!({"year": "0", "borough": "Bronx", "median_rent": "1500", "median_income": "40000"})),
            raw(json!({"year": "2020.5", "borough": "Bronx", "median_rent": "1500", "median_income": "40000"})),
            raw(json!({"year": 2020, "borough": "", "median_rent": 1500, "median_income": 40000})),
            raw(json!({"year": 2020, "median_rent": 1500, "median_income": 40000})),
            raw(json!({"year": 2020, "borough": "Queens", "median_rent": "abc", "median_income": 40000})),
            raw(json!({"year": 2020, "borough": "Queens", "median_rent": 1500, "median_income": 0})),
            raw(json!({"year": 2021, "borough": "Queens", "median_rent": 1600, "median_income": 41000, "subway_access_score": "", "air_quality_index": "44"})),
        ];

        let records = clean_records(&rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], record(2020, "Bronx", 1500.0, 40000.0));
        assert_eq!(records[1].subway_access_score, None);
        assert_eq!(records[1].air_quality_index, Some(44.0));

        assert_eq!(Record::try_from(&rows[1]), Err(RowRejection::InvalidYear));
        assert_eq!(Record::try_from(&rows[2]), Err(RowRejection::InvalidYear));
        assert_eq!(Record::try_from(&rows[3]), Err(RowRejection::MissingBorough));
        assert_eq!(Record::try_from(&rows[5]), Err(RowRejection::InvalidRent));
        assert_eq!(Record::try_from(&rows[6]), Err(RowRejection::InvalidIncome));
    }

    #[test]
    fn test_clean_records_idempotent() {
        let records = embedded_data().records;
        assert!(!records.is_empty());

        let mut partial = records.clone();
        partial[0].subway_access_score = None;
        partial[1].air_quality_index = None;

        for input in [records, partial] {
            let raw_rows: Vec<RawRow> = input.iter().map(Record::to_raw).collect();
            assert_eq!(clean_records(&raw_rows), input);
        }
    }

    #[test]
    fn test_filter_records_composes() {
        let records = embedded_data().records;
        let boroughs = vec!["Bronx".to_string(), "Queens".to_string()];

        let by_year = filter_records(&records, &RecordFilter::year(2020));
        let year_then_borough = filter_records(&by_year, &RecordFilter::boroughs(boroughs.clone()));
        let both = filter_records(&records, &RecordFilter { year: Some(2020), boroughs: boroughs.clone() });

        assert_eq!(year_then_borough, both);
        assert_eq!(both.len(), 2);
        assert!(both.iter().all(|r| r.year == 2020 && boroughs.contains(&r.borough)));

        assert_eq!(filter_records(&records, &RecordFilter::default()), records);
        assert_eq!(filter_records(&records, &RecordFilter::year(0)), records);
        assert!(filter_records(&records, &RecordFilter::year(1999)).is_empty());
    }

    #[test]
    fn test_grouping_helpers() {
        let records = vec![
            record(2021, "Queens", 1500.0, 50000.0),
            record(2020, "Bronx", 1000.0, 40000.0),
            record(2021, "Bronx", 1100.0, 41000.0),
            record(2022, "Manhattan", 3000.0, 90000.0),
        ];

        assert_eq!(unique_years(&records), vec![2020, 2021, 2022]);
        assert_eq!(unique_boroughs(&records), vec!["Bronx", "Manhattan", "Queens"]);
        assert_eq!(latest_year(&records), Some(2022));
        assert_eq!(latest_year(&[]), None);
        assert_eq!(year_range(&records), Some(YearRange { min: 2020, max: 2022 }));

        let groups = group_by_borough(&records);
        let names: Vec<&str> = groups.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Queens", "Bronx", "Manhattan"]);
        assert_eq!(groups[1].1.len(), 2);

        let window = latest_window(&records, 2);
        assert!(window.iter().all(|r| r.year >= 2021));
        assert_eq!(window.len(), 3);

        assert_eq!(aggregate_for_year(&records, 2021).len(), 2);
        assert_eq!(latest_year_snapshot(&records), vec![records[3].clone()]);
    }

    #[test]
    fn test_latest_snapshot_sorted_by_rent() {
        let records = embedded_data().records;
        let snapshot = latest_year_snapshot(&records);
        assert_eq!(snapshot.len(), 5);
        assert!(snapshot.iter().all(|r| r.year == 2024));
        assert!(snapshot.windows(2).all(|pair| pair[0].median_rent >= pair[1].median_rent));
        assert_eq!(snapshot[0].borough, "Manhattan");
    }

    #[test]
    fn test_growth_doubling() {
        let records = vec![
            record(2020, "X", 1000.0, 50000.0),
            record(2021, "X", 1500.0, 52000.0),
            record(2022, "X", 2000.0, 55000.0),
        ];

        let growth = calculate_rent_growth(&records);
        let entry = &growth["X"];
        assert_eq!(entry.start_year, 2020);
        assert_eq!(entry.end_year, 2022);
        assert_eq!(entry.absolute, 1000.0);
        assert_eq!(entry.pct, 100.0);
    }

    #[test]
    fn test_rent_growth_scenario() {
        let records = vec![record(2010, "X", 1000.0, 50000.0), record(2024, "X", 2000.0, 60000.0)];

        let growth = calculate_rent_growth(&records);
        assert_eq!(growth.len(), 1);
        assert_eq!(growth["X"], GrowthEntry {
            start_year: 2010,
            end_year: 2024,
            start_value: 1000.0,
            end_value: 2000.0,
            absolute: 1000.0,
            pct: 100.0,
        });
    }

    #[test]
    fn test_disparity_scenario() {
        let records = vec![
            record(2020, "A", 1000.0, 50000.0),
            record(2020, "B", 1500.0, 50000.0),
            record(2020, "C", 2000.0, 50000.0),
        ];

        let disparity = calculate_disparity(&records);
        assert_eq!(disparity.len(), 1);
        assert_eq!(disparity[&2020], DisparitySnapshot { max: 2000.0, min: 1000.0, spread: 1000.0 });
    }

    #[test]
    fn test_growth_skips_missing_endpoints_and_guards_zero() {
        let records = vec![
            full_record(2020, "A", 1000.0, 50000.0, 0.0, 40.0),
            full_record(2022, "A", 1200.0, 51000.0, 60.0, 42.0),
            record(2021, "B", 900.0, 30000.0),
            record(2022, "B", 950.0, 31000.0),
        ];

        let rent = calculate_rent_growth(&records);
        assert!(rent.contains_key("A"));
        assert!(!rent.contains_key("B"));

        let subway = calculate_growth(&records, Metric::SubwayAccessScore);
        assert_eq!(subway["A"].pct, 0.0);
        assert_eq!(subway["A"].absolute, 60.0);

        assert!(calculate_growth(&[], Metric::MedianRent).is_empty());
    }

    #[test]
    fn test_year_over_year_same_borough_pairs() {
        let records = vec![
            record(2020, "A", 1000.0, 50000.0),
            record(2021, "A", 1100.0, 50000.0),
            record(2022, "A", 1210.0, 50000.0),
        ];
        let yoy = calculate_year_over_year(&records);
        let entries = &yoy["A"];
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].year, 2021);
        assert_eq!(entries[0].change, 100.0);
        assert!((entries[0].pct - 10.0).abs() < 1e-12);
        assert!((entries[1].pct - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_year_over_year_skips_cross_borough_pairs() {
        let records = vec![
            record(2020, "A", 1000.0, 50000.0),
            record(2021, "A", 1100.0, 50000.0),
            record(2020, "B", 2000.0, 50000.0),
            record(2021, "B", 2200.0, 50000.0),
        ];

        // Sorted by year then rent: A2020, B2020, A2021, B2021. No adjacent pair shares a borough.
        let yoy = calculate_year_over_year(&records);
        assert!(yoy.is_empty());

        let per_borough = borough_year_over_year(&records);
        assert_eq!(per_borough["A"][0].pct, None);
        assert_eq!(per_borough["A"][1].pct, Some(10.0));
        assert_eq!(per_borough["B"][1].pct, Some(10.0));
    }

    #[test]
    fn test_disparity() {
        let records = vec![
            record(2020, "A", 2000.0, 50000.0),
            record(2020, "B", 1000.0, 50000.0),
            record(2020, "C", 1000.0, 50000.0),
            record(2021, "A", 1500.0, 50000.0),
        ];

        let disparity = calculate_disparity(&records);
        assert_eq!(disparity[&2020], DisparitySnapshot { max: 2000.0, min: 1000.0, spread: 1000.0 });
        assert_eq!(disparity[&2021].spread, 0.0);
        assert!(calculate_disparity(&[]).is_empty());
    }

    #[test]
    fn test_pearson_symmetry_and_bounds() {
        let records = embedded_data().records;
        let pairs = [
            (Metric::MedianIncome, Metric::MedianRent),
            (Metric::SubwayAccessScore, Metric::MedianRent),
            (Metric::AirQualityIndex, Metric::MedianIncome),
        ];

        for (x, y) in pairs {
            let forward = pearson_correlation(&records, x, y).expect("correlation defined");
            let backward = pearson_correlation(&records, y, x).expect("correlation defined");
            assert!((forward - backward).abs() < 1e-12);
            assert!((-1.0..=1.0).contains(&forward));
        }
    }

    #[test]
    fn test_pearson_matches_statrs() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 150.0).unwrap();
        let records: Vec<Record> = (0..200)
            .map(|i| {
                let income = 30000.0 + 400.0 * i as f64;
                let rent = 800.0 + 0.02 * income + noise.sample(&mut rng);
                record(2000 + i, "A", rent, income)
            })
            .collect();

        let xs: Vec<f64> = records.iter().map(|r| r.median_income).collect();
        let ys: Vec<f64> = records.iter().map(|r| r.median_rent).collect();
        let expected = xs.iter().covariance(ys.iter()) / (xs.iter().std_dev() * ys.iter().std_dev());

        let r = pearson_correlation(&records, Metric::MedianIncome, Metric::MedianRent).unwrap();
        assert!(relative_error(r, expected) < 1e-9, "r = {}, expected {}", r, expected);
    }

    #[test]
    fn test_pearson_degenerate_inputs() {
        assert_eq!(pearson_correlation(&[], Metric::MedianIncome, Metric::MedianRent), None);

        let constant = vec![record(2020, "A", 1000.0, 50000.0), record(2021, "A", 1100.0, 50000.0)];
        assert_eq!(pearson_correlation(&constant, Metric::MedianIncome, Metric::MedianRent), None);

        let no_subway = vec![record(2020, "A", 1000.0, 40000.0), record(2021, "A", 1100.0, 50000.0)];
        let correlations = rent_correlations(&no_subway);
        assert_eq!(correlations.rent_subway, None);
        assert_eq!(correlations.rent_air, None);
        assert!((correlations.rent_income.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_regression_recovers_known_coefficients() {
        let records = generate_linear_records(40, 42);
        let result = ols_regression(&records).expect("well-conditioned design");

        let c = result.coefficients;
        assert!((c.intercept - 5.0).abs() < 1e-6, "intercept = {}", c.intercept);
        assert!((c.income - 2.0).abs() < 1e-6, "income = {}", c.income);
        assert!((c.subway - 3.0).abs() < 1e-6, "subway = {}", c.subway);
        assert!((c.inverse_air - 1.0).abs() < 1e-6, "inverse_air = {}", c.inverse_air);
        assert!((result.r2 - 1.0).abs() < 1e-9);
        assert_eq!(result.predictions.len(), records.len());
        assert!(result.residuals.iter().all(|r| r.abs() < 1e-6));
    }

    #[test]
    fn test_regression_is_reproducible() {
        let records = embedded_data().records;
        let window = regression_window(&records);
        let first = ols_regression(&window).unwrap();
        let second = ols_regression(&window).unwrap();

        let bits = |r: &RegressionResult| -> Vec<u64> {
            r.coefficients.as_array().iter().chain(&r.predictions).map(|v| v.to_bits()).collect()
        };
        assert_eq!(bits(&first), bits(&second));
    }

    #[test]
    fn test_regression_singular_and_empty() {
        assert!(ols_regression(&[]).is_none());

        let identical: Vec<Record> = (0..3)
            .map(|_| full_record(2020, "A", 1500.0, 50.0, 80.0, 40.0))
            .collect();
        assert!(ols_regression(&identical).is_none());

        let three_observations = vec![
            full_record(2020, "A", 1000.0, 1.0, 0.0, 100.0),
            full_record(2021, "A", 1100.0, 2.0, 1.0, 100.0),
            full_record(2022, "A", 1300.0, 3.0, 5.0, 100.0),
        ];
        assert!(ols_regression(&three_observations).is_none());

        let without_predictors = vec![record(2020, "A", 1000.0, 40000.0), record(2021, "A", 1100.0, 42000.0)];
        assert!(ols_regression(&without_predictors).is_none());
    }

    #[test]
    fn test_regression_keeps_incomplete_records_aligned() {
        let mut records = generate_linear_records(20, 3);
        records.insert(0, record(2010, "Z", 9999.0, 50.0));
        records[7].air_quality_index = None;

        let result = ols_regression(&records).unwrap();
        assert_eq!(result.predictions.len(), records.len());
        assert_eq!(result.residuals.len(), records.len());
        for (i, row) in records.iter().enumerate() {
            let expected = row.median_rent - result.predictions[i];
            assert!((result.residuals[i] - expected).abs() < 1e-9, "row {} misaligned", i);
        }

        let design = DesignMatrix::from_records(&records).unwrap();
        assert_eq!(design.nobs(), records.len());
        assert_eq!(design.x[(0, 2)], 0.0);
        assert_eq!(design.x[(0, 3)], 100.0);
        assert_eq!(design.x[(7, 3)], 100.0);
        assert_eq!(design.years[0], 2010);
    }

    #[test]
    fn test_diagnostics_shape() {
        let mut rng = StdRng::seed_from_u64(11);
        let noise = Normal::new(0.0, 2.0).unwrap();
        let records: Vec<Record> = generate_linear_records(60, 5)
            .into_iter()
            .map(|mut r| {
                r.median_rent += noise.sample(&mut rng);
                r
            })
            .collect();

        let design = DesignMatrix::from_records(&records).unwrap();
        let diagnostics = diagnose(&design).expect("diagnostics defined");
        let fit = ols_regression(&records).unwrap();

        assert_eq!(diagnostics.nobs, 60);
        assert_eq!(diagnostics.window_years, (2000..2010).collect::<Vec<_>>());
        assert!(diagnostics.adj_r2 <= fit.r2);
        assert!(diagnostics.stderr.as_array().iter().all(|se| *se > 0.0));
        assert!(diagnostics.pvalues.as_array().iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(diagnostics.pvalues.income < 1e-6);

        let ci = &diagnostics.confidence_intervals["income"];
        assert!(ci.lower < fit.coefficients.income && fit.coefficients.income < ci.upper);

        assert_eq!(diagnostics.vif.len(), 3);
        assert!(diagnostics.vif.values().all(|v| *v >= 1.0 - 1e-9));

        let bp = diagnostics.breusch_pagan.expect("Breusch-Pagan defined");
        assert!(bp.lm_stat >= 0.0);
        assert!((0.0..=1.0).contains(&bp.lm_pvalue));

        let too_few = DesignMatrix::from_records(&records[..4]).unwrap();
        assert!(diagnose(&too_few).is_none());
    }

    #[test]
    fn test_summarize_empty_sentinel() {
        let summary = summarize(&[]);
        assert!(summary.is_empty());
        assert_eq!(summary, Summary::empty());
        assert!(summary.headlines.is_empty());
    }

    #[test]
    fn test_summarize_embedded_dataset() {
        let records = embedded_data().records;
        assert_eq!(records.len(), 75);

        let summary = summarize(&records);
        assert_eq!(summary.latest_year, Some(2024));
        assert_eq!(summary.growth.len(), 5);
        assert!((summary.growth["Brooklyn"].pct - 86.666_666_666).abs() < 1e-6);
        assert_eq!(summary.latest_rows[0].borough, "Manhattan");
        assert_eq!(summary.latest_rows[0].median_rent, 3600.0);
        assert!(summary.regression.is_some());
        assert_eq!(summary.disparity[&2024].spread, 1800.0);

        assert_eq!(summary.headlines.len(), 3);
        assert_eq!(summary.headlines[0].title, "Brooklyn leads rent acceleration");
        assert_eq!(summary.headlines[1].title, "Manhattan remains the price ceiling");
        assert!(summary.headlines[1].body.contains("$3,600"));
        assert!(summary.headlines[1].body.contains("$1,800 above"));
        assert!(summary.headlines[2].title.ends_with("alignment is strongest"));
    }

    #[test]
    fn test_select_headlines_tie_breaks() {
        let records = vec![
            record(2020, "Queens", 1000.0, 40000.0),
            record(2020, "Bronx", 1000.0, 41000.0),
            record(2021, "Queens", 1500.0, 45000.0),
            record(2021, "Bronx", 1500.0, 44000.0),
        ];

        let summary = summarize(&records);
        let selection = select_headlines(&summary, &records, records.len()).unwrap();
        assert_eq!(selection.growth_leader, "Bronx");
        assert_eq!(selection.top_rent.borough, "Queens");
        assert_eq!(selection.latest_year, 2021);
        assert_eq!(selection.dominant_driver, None);
    }

    /// A two-borough summary with the given correlations and regression coefficients.
    fn summary_with(correlations: Correlations, coefficients: Option<Coefficients>) -> Summary {
        let records = vec![
            record(2020, "Bronx", 1000.0, 40000.0),
            record(2020, "Queens", 1200.0, 50000.0),
            record(2021, "Bronx", 1100.0, 41000.0),
            record(2021, "Queens", 1300.0, 52000.0),
        ];
        Summary {
            correlations,
            regression: coefficients.map(|coefficients| RegressionResult {
                coefficients,
                r2: 0.9,
                residual_std: 1.0,
                predictions: Vec::new(),
                residuals: Vec::new(),
            }),
            ..summarize(&records)
        }
    }

    fn coefficients(intercept: f64, income: f64, subway: f64, inverse_air: f64) -> Coefficients {
        Coefficients { intercept, income, subway, inverse_air }
    }

    #[test]
    fn test_select_headlines_strongest_correlation() {
        let cases = [
            ((Some(0.5), Some(-0.9), Some(0.3)), (CorrelationKind::RentSubway, -0.9)),
            ((Some(0.2), Some(0.1), Some(-0.6)), (CorrelationKind::RentAir, -0.6)),
            ((Some(0.7), Some(-0.7), Some(0.7)), (CorrelationKind::RentIncome, 0.7)),
            ((None, Some(0.4), Some(-0.4)), (CorrelationKind::RentSubway, 0.4)),
            ((Some(-0.3), None, Some(0.3)), (CorrelationKind::RentIncome, -0.3)),
        ];

        for ((rent_income, rent_subway, rent_air), expected) in cases {
            let summary = summary_with(Correlations { rent_income, rent_subway, rent_air }, None);
            let selection = select_headlines(&summary, &[], 4).unwrap();
            assert_eq!(selection.strongest_correlation, Some(expected));
        }

        let summary = summary_with(Correlations::default(), None);
        let selection = select_headlines(&summary, &[], 4).unwrap();
        assert_eq!(selection.strongest_correlation, None);
        assert!(generate_headlines(&selection)[2].title.starts_with("Income"));
    }

    #[test]
    fn test_select_headlines_dominant_driver() {
        let cases = [
            (coefficients(5000.0, 0.01, -25.0, 10.0), (Driver::Subway, -25.0)),
            (coefficients(-300.0, 0.02, 4.0, -12.5), (Driver::InverseAir, -12.5)),
            (coefficients(0.0, 8.0, -3.0, 1.0), (Driver::Income, 8.0)),
            (coefficients(1.0, 3.0, -3.0, 3.0), (Driver::Income, 3.0)),
            (coefficients(1.0, 1.0, -3.0, 3.0), (Driver::Subway, -3.0)),
        ];

        for (coefficients, expected) in cases {
            let summary = summary_with(Correlations::default(), Some(coefficients));
            let selection = select_headlines(&summary, &[], 4).unwrap();
            assert_eq!(selection.dominant_driver, Some(expected));
        }
    }

    #[test]
    fn test_summarize_selects_known_driver() {
        let mut rng = StdRng::seed_from_u64(19);
        let income = Uniform::new(20.0, 80.0);
        let subway = Uniform::new(40.0, 95.0);
        let air = Uniform::new(30.0, 60.0);

        let records: Vec<Record> = ["Bronx", "Brooklyn", "Manhattan", "Queens"]
            .iter()
            .flat_map(|borough| (2015..2025).map(move |year| (*borough, year)))
            .map(|(borough, year)| {
                let x1 = income.sample(&mut rng);
                let x2 = subway.sample(&mut rng);
                let aqi = air.sample(&mut rng);
                let rent = 5.0 + 2.0 * x1 - 6.0 * x2 + 1.0 * (100.0 - aqi) + 1000.0;
                full_record(year, borough, rent, x1, x2, aqi)
            })
            .collect();

        let summary = summarize(&records);
        let regression = summary.regression.as_ref().expect("well-conditioned window");
        assert!((regression.coefficients.subway + 6.0).abs() < 1e-6);

        let window = regression_window(&records);
        let selection = select_headlines(&summary, &window, records.len()).unwrap();
        let (driver, beta) = selection.dominant_driver.unwrap();
        assert_eq!(driver, Driver::Subway);
        assert!((beta + 6.0).abs() < 1e-6);

        let strongest = CorrelationKind::ALL
            .into_iter()
            .filter_map(|kind| summary.correlations.get(kind).map(|r| (kind, r.abs())))
            .fold(None, |best: Option<(CorrelationKind, f64)>, item| match best {
                Some(current) if current.1 >= item.1 => Some(current),
                _ => Some(item),
            })
            .map(|(kind, _)| kind);
        assert_eq!(selection.strongest_correlation.map(|(kind, _)| kind), strongest);
        assert_eq!(selection.latest_year, 2024);
    }

    #[test]
    fn test_heatmap_and_views() {
        let records = embedded_data().records;
        let summary = summarize(&records);

        let heatmap = heatmap_data(&records, HeatmapMetric::MedianRent, None);
        assert_eq!(heatmap.boroughs.len(), 5);
        assert_eq!(heatmap.years.len(), 15);
        assert_eq!(heatmap.matrix[0][0], Some(1000.0));

        let growth = heatmap_data(&records, "rent_growth".parse().unwrap(), Some(&summary.yoy));
        assert_eq!(growth.matrix.len(), 5);
        assert!("bogus".parse::<HeatmapMetric>().is_err());

        let metrics = latest_metrics(&records, 2024, &["Bronx".to_string(), "Manhattan".to_string()]);
        assert_eq!(metrics.rank.len(), 2);
        assert_eq!(metrics.rank[0].borough, "Manhattan");
        assert_eq!(metrics.average_rent, Some(2700.0));

        let scatter = compile_scatter(&records, &["Queens".to_string()]);
        assert_eq!(scatter.len(), 15);
        assert!(scatter.iter().all(|p| p.r >= 4.0));

        let payload = build_viz_payload(&records, "2024-01-01T00:00:00Z");
        assert_eq!(payload.series["Bronx"].year.len(), 15);
        assert_eq!(payload.yoy["Bronx"][0].pct, None);
    }

    #[test]
    fn test_build_summary_payload_merges_base() {
        let records = embedded_data().records;
        let summary = summarize(&records);
        let diagnostics = window_diagnostics(&records);
        let base = json!({"title": "NYC Housing", "growth": "stale"});

        let payload = build_summary_payload(&base, &summary, diagnostics.as_ref(), "2024-01-01T00:00:00Z");
        assert_eq!(payload["title"], "NYC Housing");
        assert_eq!(payload["generated_at"], "2024-01-01T00:00:00Z");
        assert_eq!(payload["latest_year"], 2024);
        assert_eq!(payload["growth"], "stale");
        assert!(payload["rent_growth"].is_object());
        assert!(payload["regression"]["coefficients"].is_object());
        assert!(payload["regression"]["adj_r2"].is_number());
    }

    #[test]
    fn test_parse_csv_and_json() {
        let csv = b"# comment line\nyear,borough,median_rent,median_income,subway_access_score,air_quality_index\n2020,Bronx,1500,40000,,45\n2021,Bronx,1600,41000,70,44\n";
        let rows = parse_csv(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["borough"], json!("Bronx"));

        let records = clean_records(&rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subway_access_score, None);
        assert_eq!(records[1].subway_access_score, Some(70.0));

        let json_rows = parse_json(br#"[{"year": 2020, "borough": "Bronx", "median_rent": 1500, "median_income": 40000}, 5]"#).unwrap();
        assert_eq!(json_rows.len(), 1);
        assert_eq!(clean_records(&json_rows)[0].median_rent, 1500.0);

        assert!(matches!(parse_json(b"not json"), Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn test_load_falls_back_to_embedded() {
        let loaded = load_records_or_embedded(std::path::Path::new("does/not/exist.csv")).await;
        assert_eq!(loaded.source, DataSource::Embedded);
        assert_eq!(loaded.records.len(), 75);
    }

    #[test]
    fn test_validator_findings() {
        let rows = vec![
            raw(json!({"year": 2020, "borough": "Bronx", "median_rent": 150, "median_income": 40000})),
            raw(json!({"year": 2020, "borough": "Bronx", "median_rent": 1500, "median_income": 500000})),
            raw(json!({"year": 2021, "borough": "Bronx", "median_rent": "x", "median_income": 40000})),
        ];
        let records = clean_records(&rows);
        let report = Validator::default().validate(&rows, &records);

        assert!(!report.is_ok());
        assert_eq!(report.missing_columns, vec!["subway_access_score", "air_quality_index"]);
        assert_eq!(report.rent_out_of_bounds.len(), 1);
        assert_eq!(report.income_out_of_bounds.len(), 1);
        assert_eq!(report.duplicates[0].count, 2);
        assert_eq!(report.rejected_rows, 1);

        let embedded = embedded_data();
        assert!(Validator::default().validate(&embedded.rows, &embedded.records).is_ok());
    }

    #[tokio::test]
    async fn test_writer_outputs() {
        let records = embedded_data().records;
        let summary = summarize(&records);
        let diagnostics = window_diagnostics(&records).unwrap();
        let dir = std::env::temp_dir().join(format!("housing-writer-{}", std::process::id()));

        let writer = SummaryWriter::new(dir.join("data"), dir.join("appendix"));
        let summary_path = writer.write_derived_summary(&Value::Null, &summary, Some(&diagnostics)).await.unwrap();
        let viz_path = writer.write_viz_payload(&records).await.unwrap();
        let report_path = writer
            .write_ols_report(summary.regression.as_ref().unwrap(), &diagnostics)
            .await
            .unwrap();

        let written: Value = serde_json::from_slice(&tokio::fs::read(&summary_path).await.unwrap()).unwrap();
        assert_eq!(written["latest_year"], 2024);
        assert!(viz_path.ends_with(VIZ_PAYLOAD_FILE));

        let report = tokio::fs::read_to_string(&report_path).await.unwrap();
        assert!(report.contains("| inverseAir |"));
        assert!(report.contains("Breusch–Pagan"));
        assert!(report.contains("2020–2024"));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_summary_handler_filters_and_caches() {
        let state = embedded_state();

        let Json(full) = get_summary(State(Arc::clone(&state)), Query(SummaryQuery::default())).await.unwrap();
        assert_eq!(full.latest_year, Some(2024));
        assert_eq!(state.cached_summaries(), 0);

        let query = SummaryQuery { year: None, boroughs: Some("Bronx, Queens".to_string()) };
        let Json(filtered) = get_summary(State(Arc::clone(&state)), Query(query)).await.unwrap();
        assert_eq!(filtered.growth.len(), 2);
        assert_eq!(state.cached_summaries(), 1);

        let query = SummaryQuery { year: None, boroughs: Some("Queens,Bronx,Bronx,Atlantis".to_string()) };
        let Json(same) = get_summary(State(Arc::clone(&state)), Query(query)).await.unwrap();
        assert_eq!(same, filtered);
        assert_eq!(state.cached_summaries(), 1);

        let query = SummaryQuery { year: Some(0), boroughs: None };
        let Json(any_year) = get_summary(State(Arc::clone(&state)), Query(query)).await.unwrap();
        assert_eq!(any_year, full);

        let query = SummaryQuery { year: Some(1999), boroughs: None };
        let Json(empty) = get_summary(State(Arc::clone(&state)), Query(query)).await.unwrap();
        assert!(empty.is_empty());
        assert_eq!(state.cached_summaries(), 1);
    }

    #[test]
    fn test_summary_cache_ignores_unmatched_filters() {
        let state = AppState::new(embedded_data().records);

        for year in 3000..8000 {
            assert!(state.summary_for(&RecordFilter::year(year)).is_empty());
        }
        for name in ["Atlantis", "Gotham", "bronx", ""] {
            assert!(state.summary_for(&RecordFilter::boroughs([name])).is_empty());
        }
        let unknown_mix = RecordFilter { year: Some(1850), boroughs: vec!["Bronx".to_string()] };
        assert!(state.summary_for(&unknown_mix).is_empty());
        assert_eq!(state.cached_summaries(), 0);

        let known = RecordFilter { year: Some(2024), boroughs: vec!["Queens".to_string(), "Bronx".to_string()] };
        let reordered = RecordFilter { year: Some(2024), boroughs: vec!["Bronx".to_string(), "Queens".to_string(), "Mars".to_string()] };
        let first = state.summary_for(&known);
        let second = state.summary_for(&reordered);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.latest_rows.len(), 2);
        assert_eq!(state.cached_summaries(), 1);
    }

    #[tokio::test]
    async fn test_metric_handlers() {
        let state = embedded_state();

        let Json(growth) = get_growth(State(Arc::clone(&state)), Query(MetricQuery::default())).await.unwrap();
        assert_eq!(growth.metric, Metric::MedianRent);
        assert_eq!(growth.growth.len(), 5);

        let query = MetricQuery { metric: Some("subway_access_score".to_string()) };
        let Json(subway) = get_growth(State(Arc::clone(&state)), Query(query)).await.unwrap();
        assert_eq!(subway.metric, Metric::SubwayAccessScore);

        let query = MetricQuery { metric: Some("bogus".to_string()) };
        let rejected = get_growth(State(Arc::clone(&state)), Query(query)).await;
        assert_eq!(rejected.err(), Some(StatusCode::BAD_REQUEST));

        let query = MetricQuery { metric: Some("bogus".to_string()) };
        let rejected = get_heatmap(State(Arc::clone(&state)), Query(query)).await;
        assert_eq!(rejected.err(), Some(StatusCode::BAD_REQUEST));

        let Json(regression) = get_regression(State(Arc::clone(&state))).await.unwrap();
        assert!(regression.regression.is_some());
        assert_eq!(regression.diagnostics.unwrap().window_years, vec![2020, 2021, 2022, 2023, 2024]);
    }

    #[tokio::test]
    async fn test_latest_metrics_handler() {
        let state = embedded_state();

        let Json(latest) = get_latest_metrics(State(Arc::clone(&state)), Query(SummaryQuery::default())).await.unwrap();
        assert_eq!(latest.rank.len(), 5);
        assert_eq!(latest.rank[0].borough, "Manhattan");

        let query = SummaryQuery { year: Some(1999), boroughs: None };
        let missing = get_latest_metrics(State(Arc::clone(&state)), Query(query)).await;
        assert_eq!(missing.err(), Some(StatusCode::NOT_FOUND));

        let Json(years) = get_years(State(Arc::clone(&state))).await.unwrap();
        assert_eq!(years.range, Some(YearRange { min: 2010, max: 2024 }));

        let Json(boroughs) = get_boroughs(State(Arc::clone(&state))).await.unwrap();
        assert_eq!(boroughs.len(), 5);
        assert!(boroughs.iter().all(|b| b.population.is_some()));
    }

    #[test]
    fn test_parse_boroughs() {
        assert_eq!(parse_boroughs(None), Vec::<String>::new());
        assert_eq!(parse_boroughs(Some(" Bronx ,,Staten Island")), vec!["Bronx", "Staten Island"]);
    }
}
