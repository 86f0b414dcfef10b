use axum::{
    extract::State,
    response::Json,
    http::StatusCode,
};
use std::sync::Arc;
use crate::{unique_boroughs, unique_years, year_range, AppState, BoroughInfo, YearsResponse, BOROUGH_META};

pub async fn get_boroughs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BoroughInfo>>, StatusCode> {
    let boroughs = unique_boroughs(&state.records)
        .into_iter()
        .map(|name| {
            let meta = BOROUGH_META.get(name.as_str());
            BoroughInfo {
                population: meta.map(|m| m.population),
                area_sq_mi: meta.map(|m| m.area_sq_mi),
                note: meta.map(|m| m.note),
                name,
            }
        })
        .collect();

    Ok(Json(boroughs))
}

pub async fn get_years(
    State(state): State<Arc<AppState>>,
) -> Result<Json<YearsResponse>, StatusCode> {
    Ok(Json(YearsResponse {
        years: unique_years(&state.records),
        range: year_range(&state.records),
    }))
}
