//! Disaster endpoints
//!
//! - GET /                     - All disasters, newest first
//! - POST /disasters/new       - Register a disaster and set up its tables
//! - GET /disasters/:id        - Disaster with warehouses, stock and hand-outs
//! - GET /disasters/:id/tables - Raw contents of the four partition tables

use crate::api::AppState;
use crate::error::Result;
use crate::partition::{PartitionDetail, PartitionSnapshot};
use crate::registry::{Disaster, NewDisaster};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Serialize)]
pub struct DisasterListResponse {
    pub disasters: Vec<Disaster>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct CreateDisasterResponse {
    pub status: String,
    pub disaster: Disaster,
    pub tables_ready: bool,
    pub tables_created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Serialize)]
pub struct DisasterDetailResponse {
    pub disaster: Disaster,
    #[serde(flatten)]
    pub detail: PartitionDetail,
}

#[derive(Serialize)]
pub struct DisasterTablesResponse {
    pub disaster: Disaster,
    pub tables: Vec<String>,
    #[serde(flatten)]
    pub data: PartitionSnapshot,
}

pub async fn list_disasters(State(state): State<Arc<AppState>>) -> Result<Json<DisasterListResponse>> {
    let disasters = state.registry.list().await?;

    Ok(Json(DisasterListResponse {
        count: disasters.len(),
        disasters,
    }))
}

/// The disaster row is kept even when its tables cannot be set up; the
/// response then carries `tables_ready: false` and the reason, and the tables
/// are created on the next request that needs them.
pub async fn create_disaster(
    State(state): State<Arc<AppState>>,
    Form(input): Form<NewDisaster>,
) -> Result<impl IntoResponse> {
    let disaster = state.registry.register(input).await?;
    let disaster_id = disaster.disaster_id;

    let response = match state.partitions.ensure_tables_exist(disaster_id).await {
        Ok(created) => {
            info!(
                "Disaster '{}' created with {} partition tables",
                disaster.name, created
            );
            CreateDisasterResponse {
                status: "created".to_string(),
                disaster,
                tables_ready: true,
                tables_created: created,
                warning: None,
            }
        }
        Err(e) => {
            warn!(
                "Disaster {} created but table setup failed: {}",
                disaster_id, e
            );
            CreateDisasterResponse {
                status: "created".to_string(),
                warning: Some(format!(
                    "Disaster \"{}\" created but table setup failed: {}",
                    disaster.name, e
                )),
                disaster,
                tables_ready: false,
                tables_created: 0,
            }
        }
    };

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn disaster_detail(
    State(state): State<Arc<AppState>>,
    Path(disaster_id): Path<i32>,
) -> Result<Json<DisasterDetailResponse>> {
    let disaster = state.disaster(disaster_id).await?;
    let detail = state.partitions.detail(disaster_id).await?;

    Ok(Json(DisasterDetailResponse { disaster, detail }))
}

pub async fn disaster_tables(
    State(state): State<Arc<AppState>>,
    Path(disaster_id): Path<i32>,
) -> Result<Json<DisasterTablesResponse>> {
    let disaster = state.disaster(disaster_id).await?;
    let (handle, data) = state.partitions.open_with_snapshot(disaster_id).await?;

    Ok(Json(DisasterTablesResponse {
        disaster,
        tables: handle.tables.names().into_iter().map(str::to_string).collect(),
        data,
    }))
}
