use axum::{
    extract::{Query, State},
    response::Json,
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{info, warn};
use crate::api::handlers::calculators::parse_metric;
use crate::{
    compile_scatter, heatmap_data, latest_metrics, parse_boroughs, unique_years, AppState,
    BoroughsQuery, HeatmapData, HeatmapMetric, LatestMetrics, MetricQuery, ScatterPoint, SummaryQuery,
};

pub async fn get_heatmap(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MetricQuery>,
) -> Result<Json<HeatmapData>, StatusCode> {
    let metric = parse_metric(params.metric.as_deref(), HeatmapMetric::MedianRent)?;
    info!("Building heatmap for {:?}", metric);

    Ok(Json(heatmap_data(&state.records, metric, Some(&state.summary.yoy))))
}

pub async fn get_latest_metrics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<LatestMetrics>, StatusCode> {
    let year = match params.year.or(state.summary.latest_year) {
        Some(year) => year,
        None => {
            warn!("No records loaded; latest metrics unavailable");
            return Err(StatusCode::NOT_FOUND);
        }
    };

    if !unique_years(&state.records).contains(&year) {
        warn!("No records for year {}", year);
        return Err(StatusCode::NOT_FOUND);
    }

    let boroughs = parse_boroughs(params.boroughs.as_deref());
    Ok(Json(latest_metrics(&state.records, year, &boroughs)))
}

pub async fn get_scatter(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BoroughsQuery>,
) -> Result<Json<Vec<ScatterPoint>>, StatusCode> {
    let boroughs = parse_boroughs(params.boroughs.as_deref());
    Ok(Json(compile_scatter(&state.records, &boroughs)))
}
