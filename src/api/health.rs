use crate::api::AppState;
use crate::pool;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    postgres_connected: bool,
    cached_partitions: usize,
    uptime_seconds: u64,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let postgres_connected = pool::ping(&state.pool).await;

    Json(HealthResponse {
        status: if postgres_connected {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        postgres_connected,
        cached_partitions: state.partitions.cached_partitions(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
