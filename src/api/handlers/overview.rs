use axum::{
    extract::{Query, State},
    response::Json,
    http::StatusCode,
};
use std::sync::Arc;
use tracing::info;
use crate::{AppState, Summary, SummaryQuery};

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<Summary>, StatusCode> {
    let filter = params.filter();
    info!("Fetching summary for year {:?}, boroughs {:?}", filter.year, filter.boroughs);

    let summary = state.summary_for(&filter);
    Ok(Json(summary.as_ref().clone()))
}
