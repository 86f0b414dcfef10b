use std::collections::HashMap;
use lazy_static::lazy_static;
use serde::Serialize;

/// Number of most recent distinct years the regression is fitted on.
pub const REGRESSION_WINDOW_YEARS: usize = 5;

/// Pivot magnitude below which Gauss-Jordan elimination looks for a row swap.
pub const PIVOT_TOLERANCE: f64 = 1e-9;

/// Number of coefficients in the rent model (intercept, income, subway, inverse air).
pub const REGRESSION_PARAMETERS: usize = 4;

pub const RENT_BOUNDS: (f64, f64) = (200.0, 10_000.0);
pub const INCOME_BOUNDS: (f64, f64) = (10_000.0, 300_000.0);

pub const DERIVED_SUMMARY_FILE: &str = "derived_summary.json";
pub const VIZ_PAYLOAD_FILE: &str = "viz_payload.json";
pub const OLS_REPORT_FILE: &str = "ols_report.md";

#[derive(Debug, Clone, Serialize)]
pub struct BoroughMeta {
    pub population: u64,
    pub area_sq_mi: f64,
    pub note: &'static str,
}

lazy_static! {
    pub static ref EXPECTED_COLUMNS: Vec<&'static str> = vec![
        "year",
        "borough",
        "median_rent",
        "median_income",
        "subway_access_score",
        "air_quality_index",
    ];

    pub static ref BOROUGH_META: HashMap<&'static str, BoroughMeta> = {
        let mut m = HashMap::new();
        m.insert("Manhattan", BoroughMeta {
            population: 1_628_706,
            area_sq_mi: 22.83,
            note: "Global finance hub; dense subway coverage and highest land values.",
        });
        m.insert("Brooklyn", BoroughMeta {
            population: 2_559_903,
            area_sq_mi: 69.5,
            note: "Diverse housing stock with rapid post-2010 rent growth in northern neighborhoods.",
        });
        m.insert("Queens", BoroughMeta {
            population: 2_253_858,
            area_sq_mi: 108.53,
            note: "Multi-family mix; strong transit nodes in LIC, Flushing drive rent gains.",
        });
        m.insert("Bronx", BoroughMeta {
            population: 1_421_697,
            area_sq_mi: 42.47,
            note: "Historically lower rents but fastest relative growth alongside new investment.",
        });
        m.insert("Staten Island", BoroughMeta {
            population: 495_747,
            area_sq_mi: 57.5,
            note: "Suburban character with ferry dependence; rents trail city median.",
        });
        m
    };
}
