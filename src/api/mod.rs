mod handlers;
mod types;
mod state;
pub use handlers::*;
pub use types::*;
pub use state::*;

use tokio::net::TcpListener;
use axum::{
    Router,
    routing::get
};
use tower_http::cors::{Any, CorsLayer};
use std::sync::Arc;
use std::net::SocketAddr;
use tracing::info;
use anyhow::Result;
use std::time::Duration;
use crate::models::Record;

/// Routes for the read-only analysis API.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_check))

        // Summary and calculators
        .route("/summary", get(get_summary))
        .route("/growth", get(get_growth))
        .route("/yoy", get(get_year_over_year))
        .route("/correlations", get(get_correlations))
        .route("/regression", get(get_regression))
        .route("/disparity", get(get_disparity))

        // Chart views
        .route("/heatmap", get(get_heatmap))
        .route("/metrics/latest", get(get_latest_metrics))
        .route("/scatter", get(get_scatter))

        // Catalog
        .route("/boroughs", get(get_boroughs))
        .route("/years", get(get_years))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(host: String, port: u16, records: Vec<Record>) -> Result<()> {
    let state = Arc::new(AppState::new(records));
    let app = router(state);

    let addr = format!("{}:{}", host, port)
        .parse::<SocketAddr>()?;

    let listener = TcpListener::bind(&addr).await?;

    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
