use axum::{
    extract::{Query, State},
    response::Json,
    http::StatusCode,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use crate::{
    calculate_growth, AppState, Correlations, DisparityMap, GrowthResponse, Metric, MetricQuery,
    RegressionResponse, YearOverYearMap,
};

/// Parses an optional `metric` query value, defaulting to rent.
pub(crate) fn parse_metric<T: FromStr<Err = String>>(raw: Option<&str>, default: T) -> Result<T, StatusCode> {
    match raw {
        None => Ok(default),
        Some(name) => T::from_str(name).map_err(|e| {
            warn!("Rejected metric query: {}", e);
            StatusCode::BAD_REQUEST
        }),
    }
}

pub async fn get_growth(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MetricQuery>,
) -> Result<Json<GrowthResponse>, StatusCode> {
    let metric = parse_metric(params.metric.as_deref(), Metric::MedianRent)?;
    info!("Computing {} growth", metric);

    let growth = match metric {
        Metric::MedianRent => state.summary.growth.clone(),
        Metric::MedianIncome => state.summary.income_growth.clone(),
        other => calculate_growth(&state.records, other),
    };

    Ok(Json(GrowthResponse { metric, growth }))
}

pub async fn get_year_over_year(
    State(state): State<Arc<AppState>>,
) -> Result<Json<YearOverYearMap>, StatusCode> {
    Ok(Json(state.summary.yoy.clone()))
}

pub async fn get_correlations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Correlations>, StatusCode> {
    Ok(Json(state.summary.correlations.clone()))
}

pub async fn get_regression(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RegressionResponse>, StatusCode> {
    if state.summary.regression.is_none() {
        warn!("Regression unavailable for the loaded records");
    }

    Ok(Json(RegressionResponse {
        regression: state.summary.regression.clone(),
        diagnostics: state.diagnostics.as_deref().cloned(),
    }))
}

pub async fn get_disparity(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DisparityMap>, StatusCode> {
    Ok(Json(state.summary.disparity.clone()))
}
