//! HTTP surface
//!
//! Form-encoded requests in, JSON out. Every disaster-scoped route looks the
//! disaster up in the registry before touching its partition, so an unknown id
//! is a 404 and never creates tables.

mod analytics;
mod disasters;
mod distribute;
mod form;
mod health;
mod resources;

pub use analytics::{analyze, predict, predict_api};
pub use disasters::{create_disaster, disaster_detail, disaster_tables, list_disasters};
pub use distribute::{distribute, distribution_form};
pub use health::health_check;
pub use resources::add_resources;

use crate::analytics::PredictionConfig;
use crate::partition::PartitionManager;
use crate::registry::{Disaster, DisasterRegistry};
use crate::error::Result;
use axum::{
    routing::{get, post},
    Router,
};
use deadpool_postgres::Pool;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared state for all handlers.
pub struct AppState {
    pub pool: Pool,
    pub registry: DisasterRegistry,
    pub partitions: PartitionManager,
    pub prediction: PredictionConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        pool: Pool,
        registry: DisasterRegistry,
        partitions: PartitionManager,
        prediction: PredictionConfig,
    ) -> Self {
        Self {
            pool,
            registry,
            partitions,
            prediction,
            started_at: Instant::now(),
        }
    }

    /// Registry lookup shared by the disaster-scoped handlers.
    async fn disaster(&self, disaster_id: i32) -> Result<Disaster> {
        self.registry.get(disaster_id).await
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(list_disasters))
        .route("/disasters/new", post(create_disaster))
        .route("/disasters/:id", get(disaster_detail))
        .route("/disasters/:id/resources/new", post(add_resources))
        .route(
            "/disasters/:id/distribute",
            get(distribution_form).post(distribute),
        )
        .route("/disasters/:id/tables", get(disaster_tables))
        .route("/disasters/:id/analyze", get(analyze))
        .route("/disasters/:id/predict", get(predict))
        .route("/disasters/:id/predict/api", get(predict_api))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
