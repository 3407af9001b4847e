//! Analytics and Prediction
//!
//! Read-only summaries over one partition snapshot: inventory totals,
//! distribution trends, per-item depletion forecasts and restocking
//! suggestions. Nothing here touches the database.

mod forecast;
mod trend;

pub use forecast::{
    forecast_items, suggest_optimizations, ItemForecast, Priority, Suggestion, SuggestionKind,
};
pub use trend::{
    analyze_trend, daily_volumes, DailyVolume, TrendAnalysis, TrendDirection, TREND_WINDOW_DAYS,
};

use crate::config::Config;
use crate::partition::PartitionSnapshot;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionConfig {
    /// Days ahead covered by demand projections.
    pub horizon_days: u32,
    /// z-score above which a day counts as a spike.
    pub z_threshold: f64,
    /// Relative slope (slope / mean) below which volume is considered stable.
    pub stable_band: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            horizon_days: 7,
            z_threshold: 2.0,
            stable_band: 0.05,
        }
    }
}

impl PredictionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self::default()
            .with_horizon_days(config.prediction_horizon_days)
            .with_z_threshold(config.spike_z_threshold)
            .with_stable_band(config.trend_stable_band)
    }

    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days.max(1);
        self
    }

    pub fn with_z_threshold(mut self, z: f64) -> Self {
        self.z_threshold = z;
        self
    }

    pub fn with_stable_band(mut self, band: f64) -> Self {
        self.stable_band = band.abs();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub warehouse_count: usize,
    pub item_count: usize,
    pub beneficiary_count: usize,
    pub distribution_count: usize,
    pub total_capacity: i64,
    pub stock_on_hand: i64,
    pub total_distributed: i64,
    pub stock_by_category: BTreeMap<String, i64>,
}

pub fn summarize(snapshot: &PartitionSnapshot) -> InventorySummary {
    let mut stock_by_category = BTreeMap::new();
    for item in &snapshot.items {
        let category = item
            .category
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        *stock_by_category.entry(category).or_insert(0) += i64::from(item.quantity);
    }

    InventorySummary {
        warehouse_count: snapshot.warehouses.len(),
        item_count: snapshot.items.len(),
        beneficiary_count: snapshot.beneficiaries.len(),
        distribution_count: snapshot.distributions.len(),
        total_capacity: snapshot
            .warehouses
            .iter()
            .map(|w| i64::from(w.capacity))
            .sum(),
        stock_on_hand: snapshot.items.iter().map(|i| i64::from(i.quantity)).sum(),
        total_distributed: snapshot
            .distributions
            .iter()
            .map(|d| i64::from(d.quantity))
            .sum(),
        stock_by_category,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub disaster_id: i32,
    pub generated_on: NaiveDate,
    pub horizon_days: u32,
    pub summary: InventorySummary,
    pub trend_analysis: TrendAnalysis,
    pub forecasts: Vec<ItemForecast>,
    pub suggestions: Vec<Suggestion>,
}

pub fn predict(
    disaster_id: i32,
    snapshot: &PartitionSnapshot,
    today: NaiveDate,
    config: &PredictionConfig,
) -> PredictionReport {
    let forecasts = forecast_items(snapshot, today, config);
    let suggestions = suggest_optimizations(snapshot, &forecasts, config);

    PredictionReport {
        disaster_id,
        generated_on: today,
        horizon_days: config.horizon_days,
        summary: summarize(snapshot),
        trend_analysis: analyze_trend(&snapshot.distributions, config),
        forecasts,
        suggestions,
    }
}
