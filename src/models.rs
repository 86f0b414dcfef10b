use serde::{Serialize, Deserialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use crate::error::RowRejection;

/// An untyped source row, as produced by CSV or JSON parsing.
pub type RawRow = serde_json::Map<String, Value>;

pub type GrowthMap = BTreeMap<String, GrowthEntry>;
pub type YearOverYearMap = BTreeMap<String, Vec<YearOverYearEntry>>;
pub type DisparityMap = BTreeMap<i32, DisparitySnapshot>;

/// Numeric coercion for raw cells.
///
/// Numbers pass through, text is trimmed and parsed and booleans are 0/1. Null, empty text
/// and anything that does not yield a finite number become `None`.
pub fn to_number(value: &Value) -> Option<f64> {
    let num = match value {
        Value::Bool(b) => if *b { 1.0 } else { 0.0 },
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    num.is_finite().then_some(num)
}

/// One borough-year observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub year: i32,
    pub borough: String,
    pub median_rent: f64,
    pub median_income: f64,
    pub subway_access_score: Option<f64>,
    pub air_quality_index: Option<f64>,
}

impl Record {
    /// Converts back into an untyped row, the inverse of `Record::try_from(&RawRow)`.
    pub fn to_raw(&self) -> RawRow {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => RawRow::new(),
        }
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::MedianRent => Some(self.median_rent),
            Metric::MedianIncome => Some(self.median_income),
            Metric::SubwayAccessScore => self.subway_access_score,
            Metric::AirQualityIndex => self.air_quality_index,
        }
    }
}

impl TryFrom<&RawRow> for Record {
    type Error = RowRejection;

    /// Years must be whole numbers: `"2020.5"` is rejected rather than kept as a fractional year.
    fn try_from(row: &RawRow) -> Result<Self, Self::Error> {
        let number = |key: &str| row.get(key).and_then(to_number);

        let year = number("year")
            .filter(|y| *y != 0.0 && y.fract() == 0.0)
            .filter(|y| *y >= i32::MIN as f64 && *y <= i32::MAX as f64)
            .ok_or(RowRejection::InvalidYear)? as i32;

        let borough = match row.get("borough") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        };
        if borough.is_empty() {
            return Err(RowRejection::MissingBorough);
        }

        let median_rent = number("median_rent")
            .filter(|v| *v != 0.0)
            .ok_or(RowRejection::InvalidRent)?;
        let median_income = number("median_income")
            .filter(|v| *v != 0.0)
            .ok_or(RowRejection::InvalidIncome)?;

        Ok(Record {
            year,
            borough,
            median_rent,
            median_income,
            subway_access_score: number("subway_access_score"),
            air_quality_index: number("air_quality_index"),
        })
    }
}

/// Numeric fields of a [`Record`] that calculators can address by name.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    MedianRent,
    MedianIncome,
    SubwayAccessScore,
    AirQualityIndex,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::MedianRent => write!(f, "median_rent"),
            Metric::MedianIncome => write!(f, "median_income"),
            Metric::SubwayAccessScore => write!(f, "subway_access_score"),
            Metric::AirQualityIndex => write!(f, "air_quality_index"),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "median_rent" => Ok(Metric::MedianRent),
            "median_income" => Ok(Metric::MedianIncome),
            "subway_access_score" => Ok(Metric::SubwayAccessScore),
            "air_quality_index" => Ok(Metric::AirQualityIndex),
            other => Err(format!("unknown metric: {}", other)),
        }
    }
}

/// Optional constraints for `filter_records`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordFilter {
    /// `None` and `Some(0)` both mean any year.
    pub year: Option<i32>,
    /// Empty means any borough.
    pub boroughs: Vec<String>,
}

impl RecordFilter {
    pub fn year(year: i32) -> Self {
        Self { year: Some(year), boroughs: Vec::new() }
    }

    pub fn boroughs<S: Into<String>>(boroughs: impl IntoIterator<Item = S>) -> Self {
        Self { year: None, boroughs: boroughs.into_iter().map(Into::into).collect() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthEntry {
    pub start_year: i32,
    pub end_year: i32,
    pub start_value: f64,
    pub end_value: f64,
    pub absolute: f64,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearOverYearEntry {
    pub year: i32,
    pub change: f64,
    pub pct: f64,
}

/// Per-borough rent change where the first year, or a zero prior rent, has no percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoroughYearChange {
    pub year: i32,
    pub rent: f64,
    pub pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisparitySnapshot {
    pub max: f64,
    pub min: f64,
    pub spread: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Correlations {
    pub rent_income: Option<f64>,
    pub rent_subway: Option<f64>,
    pub rent_air: Option<f64>,
}

/// The three rent correlations reported in a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationKind {
    RentIncome,
    RentSubway,
    RentAir,
}

impl CorrelationKind {
    pub const ALL: [CorrelationKind; 3] = [
        CorrelationKind::RentIncome,
        CorrelationKind::RentSubway,
        CorrelationKind::RentAir,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CorrelationKind::RentIncome => "household income",
            CorrelationKind::RentSubway => "subway access",
            CorrelationKind::RentAir => "air quality (lower is better)",
        }
    }

    pub fn predictor(&self) -> Metric {
        match self {
            CorrelationKind::RentIncome => Metric::MedianIncome,
            CorrelationKind::RentSubway => Metric::SubwayAccessScore,
            CorrelationKind::RentAir => Metric::AirQualityIndex,
        }
    }
}

impl Correlations {
    pub fn get(&self, kind: CorrelationKind) -> Option<f64> {
        match kind {
            CorrelationKind::RentIncome => self.rent_income,
            CorrelationKind::RentSubway => self.rent_subway,
            CorrelationKind::RentAir => self.rent_air,
        }
    }
}

/// Non-intercept regression terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Driver {
    #[serde(rename = "income")]
    Income,
    #[serde(rename = "subway")]
    Subway,
    #[serde(rename = "inverseAir")]
    InverseAir,
}

impl Driver {
    pub const ALL: [Driver; 3] = [Driver::Income, Driver::Subway, Driver::InverseAir];
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Driver::Income => write!(f, "income"),
            Driver::Subway => write!(f, "subway"),
            Driver::InverseAir => write!(f, "inverseAir"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coefficients {
    pub intercept: f64,
    pub income: f64,
    pub subway: f64,
    pub inverse_air: f64,
}

impl Coefficients {
    pub fn from_beta(beta: &[f64]) -> Self {
        Self {
            intercept: beta[0],
            income: beta[1],
            subway: beta[2],
            inverse_air: beta[3],
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.intercept, self.income, self.subway, self.inverse_air]
    }

    pub fn driver(&self, driver: Driver) -> f64 {
        match driver {
            Driver::Income => self.income,
            Driver::Subway => self.subway,
            Driver::InverseAir => self.inverse_air,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionResult {
    pub coefficients: Coefficients,
    pub r2: f64,
    pub residual_std: f64,
    pub predictions: Vec<f64>,
    pub residuals: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreuschPagan {
    pub lm_stat: f64,
    pub lm_pvalue: f64,
    pub f_stat: f64,
    pub f_pvalue: f64,
}

/// Inference statistics for a fitted rent model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionDiagnostics {
    pub stderr: Coefficients,
    pub tvalues: Coefficients,
    pub pvalues: Coefficients,
    pub confidence_intervals: BTreeMap<String, ConfidenceInterval>,
    pub adj_r2: f64,
    pub nobs: usize,
    pub vif: BTreeMap<String, f64>,
    pub breusch_pagan: Option<BreuschPagan>,
    pub window_years: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub body: String,
    pub evidence: Vec<Value>,
    pub caveats: String,
}

/// The entities a set of headlines is built around.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineSelection {
    pub growth_leader: String,
    pub growth: GrowthEntry,
    pub top_rent: Record,
    pub strongest_correlation: Option<(CorrelationKind, f64)>,
    pub dominant_driver: Option<(Driver, f64)>,
    pub latest_spread: Option<DisparitySnapshot>,
    pub latest_year: i32,
    pub observations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub growth: GrowthMap,
    pub income_growth: GrowthMap,
    pub yoy: YearOverYearMap,
    pub latest_rows: Vec<Record>,
    pub correlations: Correlations,
    pub regression: Option<RegressionResult>,
    pub disparity: DisparityMap,
    pub headlines: Vec<Headline>,
    pub latest_year: Option<i32>,
}

impl Summary {
    /// The "needs data" sentinel returned for an empty record set.
    pub fn empty() -> Self {
        Self {
            growth: GrowthMap::new(),
            income_growth: GrowthMap::new(),
            yoy: YearOverYearMap::new(),
            latest_rows: Vec::new(),
            correlations: Correlations::default(),
            regression: None,
            disparity: DisparityMap::new(),
            headlines: Vec::new(),
            latest_year: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.latest_year.is_none()
    }
}
