//! POST /disasters/:id/resources/new - Add a warehouse with its first relief item

use crate::api::form::int_or;
use crate::api::AppState;
use crate::error::Result;
use crate::partition::{ItemFields, WarehouseFields};
use crate::registry::non_empty;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct ResourceForm {
    #[serde(default)]
    pub warehouse_location: Option<String>,
    #[serde(default)]
    pub warehouse_capacity: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub item_category: Option<String>,
    #[serde(default)]
    pub item_quantity: Option<String>,
}

impl ResourceForm {
    fn into_fields(self) -> Result<(WarehouseFields, ItemFields)> {
        let warehouse = WarehouseFields {
            location: non_empty(&self.warehouse_location).unwrap_or_default(),
            capacity: int_or("Warehouse capacity", &self.warehouse_capacity, 0)?,
        };
        let item = ItemFields {
            name: non_empty(&self.item_name).unwrap_or_default(),
            category: non_empty(&self.item_category),
            quantity: int_or("Item quantity", &self.item_quantity, 0)?,
        };
        Ok((warehouse, item))
    }
}

#[derive(Serialize)]
pub struct AddResourcesResponse {
    pub status: String,
    pub disaster_id: i32,
    pub warehouse_id: i32,
    pub item_id: i32,
}

pub async fn add_resources(
    State(state): State<Arc<AppState>>,
    Path(disaster_id): Path<i32>,
    Form(form): Form<ResourceForm>,
) -> Result<impl IntoResponse> {
    state.disaster(disaster_id).await?;

    let (warehouse, item) = form.into_fields()?;
    let (warehouse_id, item_id) = state
        .partitions
        .add_warehouse_and_item(disaster_id, warehouse, item)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AddResourcesResponse {
            status: "created".to_string(),
            disaster_id,
            warehouse_id,
            item_id,
        }),
    ))
}
