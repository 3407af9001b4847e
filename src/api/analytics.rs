//! Analytics endpoints
//!
//! - GET /disasters/:id/analyze     - Partition contents with an inventory summary
//! - GET /disasters/:id/predict     - Partition contents with the prediction report
//! - GET /disasters/:id/predict/api - Prediction report only

use crate::analytics::{self, InventorySummary, PredictionReport, TrendAnalysis};
use crate::api::AppState;
use crate::error::Result;
use crate::partition::PartitionSnapshot;
use crate::registry::Disaster;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub disaster: Disaster,
    pub data: PartitionSnapshot,
    pub summary: InventorySummary,
    pub trend_analysis: TrendAnalysis,
}

#[derive(Serialize)]
pub struct PredictResponse {
    pub disaster: Disaster,
    pub data: PartitionSnapshot,
    pub report: PredictionReport,
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Path(disaster_id): Path<i32>,
) -> Result<Json<AnalyzeResponse>> {
    let disaster = state.disaster(disaster_id).await?;
    let data = state.partitions.list_partition_data(disaster_id).await?;

    let summary = analytics::summarize(&data);
    let trend_analysis = analytics::analyze_trend(&data.distributions, &state.prediction);

    Ok(Json(AnalyzeResponse {
        disaster,
        data,
        summary,
        trend_analysis,
    }))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Path(disaster_id): Path<i32>,
) -> Result<Json<PredictResponse>> {
    let disaster = state.disaster(disaster_id).await?;
    let data = state.partitions.list_partition_data(disaster_id).await?;

    let report = analytics::predict(
        disaster_id,
        &data,
        Local::now().date_naive(),
        &state.prediction,
    );
    debug!(
        "Disaster {}: {} forecasts, {} suggestions",
        disaster_id,
        report.forecasts.len(),
        report.suggestions.len()
    );

    Ok(Json(PredictResponse {
        disaster,
        data,
        report,
    }))
}

pub async fn predict_api(
    State(state): State<Arc<AppState>>,
    Path(disaster_id): Path<i32>,
) -> Result<Json<PredictionReport>> {
    state.disaster(disaster_id).await?;
    let data = state.partitions.list_partition_data(disaster_id).await?;

    Ok(Json(analytics::predict(
        disaster_id,
        &data,
        Local::now().date_naive(),
        &state.prediction,
    )))
}
