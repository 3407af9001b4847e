//! Distribution endpoints
//!
//! - GET /disasters/:id/distribute  - Items that can be handed out
//! - POST /disasters/:id/distribute - Record a hand-out and decrement stock

use crate::api::form::{date_or, int_or, required_int};
use crate::api::AppState;
use crate::error::Result;
use crate::partition::{BeneficiaryFields, ItemWithWarehouse};
use crate::registry::{non_empty, Disaster};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize)]
pub struct DistributionFormResponse {
    pub disaster: Disaster,
    pub items: Vec<ItemWithWarehouse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DistributionForm {
    #[serde(default)]
    pub beneficiary_name: Option<String>,
    #[serde(default)]
    pub beneficiary_location: Option<String>,
    #[serde(default)]
    pub beneficiary_contact: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug)]
struct DistributionRequest {
    beneficiary: BeneficiaryFields,
    item_id: i32,
    quantity: i32,
    date: NaiveDate,
}

impl DistributionForm {
    fn parse(self, today: NaiveDate) -> Result<DistributionRequest> {
        Ok(DistributionRequest {
            beneficiary: BeneficiaryFields {
                name: non_empty(&self.beneficiary_name).unwrap_or_default(),
                location: non_empty(&self.beneficiary_location),
                contact: non_empty(&self.beneficiary_contact),
            },
            item_id: required_int("Item", &self.item_id)?,
            quantity: int_or("Quantity", &self.quantity, 0)?,
            date: date_or(&self.date, today)?,
        })
    }
}

#[derive(Serialize)]
pub struct DistributeResponse {
    pub status: String,
    pub disaster_id: i32,
    pub dist_id: i32,
    pub item_id: i32,
    pub quantity: i32,
    pub date: NaiveDate,
}

pub async fn distribution_form(
    State(state): State<Arc<AppState>>,
    Path(disaster_id): Path<i32>,
) -> Result<Json<DistributionFormResponse>> {
    let disaster = state.disaster(disaster_id).await?;
    let items = state.partitions.available_items(disaster_id).await?;

    Ok(Json(DistributionFormResponse { disaster, items }))
}

pub async fn distribute(
    State(state): State<Arc<AppState>>,
    Path(disaster_id): Path<i32>,
    Form(form): Form<DistributionForm>,
) -> Result<impl IntoResponse> {
    state.disaster(disaster_id).await?;

    let request = form.parse(Local::now().date_naive())?;
    let dist_id = state
        .partitions
        .record_distribution(
            disaster_id,
            request.beneficiary,
            request.item_id,
            request.quantity,
            request.date,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DistributeResponse {
            status: "recorded".to_string(),
            disaster_id,
            dist_id,
            item_id: request.item_id,
            quantity: request.quantity,
            date: request.date,
        }),
    ))
}
