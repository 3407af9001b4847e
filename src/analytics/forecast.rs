//! Per-item stock forecasts and the suggestions derived from them.

use crate::analytics::PredictionConfig;
use crate::partition::PartitionSnapshot;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemForecast {
    pub item_id: i32,
    pub name: String,
    pub warehouse_id: i32,
    pub quantity_on_hand: i32,
    pub total_distributed: i64,
    pub avg_daily_consumption: f64,
    /// Expected demand over the configured horizon.
    pub projected_demand: f64,
    /// `None` while nothing has been handed out.
    pub days_until_depleted: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    OutOfStock,
    LowStock,
    OverCapacity,
    EmptyWarehouse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub priority: Priority,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<i32>,
}

pub fn forecast_items(
    snapshot: &PartitionSnapshot,
    today: NaiveDate,
    config: &PredictionConfig,
) -> Vec<ItemForecast> {
    // item_id -> (total, first date, last date)
    let mut history: HashMap<i32, (i64, NaiveDate, NaiveDate)> = HashMap::new();
    for d in &snapshot.distributions {
        let entry = history
            .entry(d.item_id)
            .or_insert((0, d.date, d.date));
        entry.0 += i64::from(d.quantity);
        entry.1 = entry.1.min(d.date);
        entry.2 = entry.2.max(d.date);
    }

    snapshot
        .items
        .iter()
        .map(|item| {
            let (total_distributed, avg_daily_consumption) = match history.get(&item.item_id) {
                Some((total, first, last)) => {
                    let end = (*last).max(today);
                    let span_days = (end - *first).num_days().max(0) + 1;
                    (*total, *total as f64 / span_days as f64)
                }
                None => (0, 0.0),
            };

            let days_until_depleted = if item.quantity <= 0 {
                Some(0.0)
            } else if avg_daily_consumption > 0.0 {
                Some(item.quantity as f64 / avg_daily_consumption)
            } else {
                None
            };

            ItemForecast {
                item_id: item.item_id,
                name: item.name.clone(),
                warehouse_id: item.warehouse_id,
                quantity_on_hand: item.quantity,
                total_distributed,
                avg_daily_consumption,
                projected_demand: avg_daily_consumption * f64::from(config.horizon_days),
                days_until_depleted,
            }
        })
        .collect()
}

pub fn suggest_optimizations(
    snapshot: &PartitionSnapshot,
    forecasts: &[ItemForecast],
    config: &PredictionConfig,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let horizon = f64::from(config.horizon_days);

    for f in forecasts {
        if f.quantity_on_hand <= 0 {
            suggestions.push(Suggestion {
                kind: SuggestionKind::OutOfStock,
                priority: Priority::High,
                message: format!("'{}' is out of stock; restock or remove it from distribution.", f.name),
                item_id: Some(f.item_id),
                warehouse_id: Some(f.warehouse_id),
            });
            continue;
        }

        if let Some(days) = f.days_until_depleted {
            if days < horizon {
                let priority = if days < horizon / 2.0 {
                    Priority::High
                } else {
                    Priority::Medium
                };
                let shortfall = (f.projected_demand - f64::from(f.quantity_on_hand)).ceil().max(0.0);
                suggestions.push(Suggestion {
                    kind: SuggestionKind::LowStock,
                    priority,
                    message: format!(
                        "'{}' runs out in about {:.1} days at {:.1} units/day; {} more units cover the next {} days.",
                        f.name, days, f.avg_daily_consumption, shortfall, config.horizon_days
                    ),
                    item_id: Some(f.item_id),
                    warehouse_id: Some(f.warehouse_id),
                });
            }
        }
    }

    let mut stock_by_warehouse: HashMap<i32, i64> = HashMap::new();
    for item in &snapshot.items {
        *stock_by_warehouse.entry(item.warehouse_id).or_insert(0) += i64::from(item.quantity.max(0));
    }

    for w in &snapshot.warehouses {
        let stock = stock_by_warehouse.get(&w.warehouse_id).copied().unwrap_or(0);

        if w.capacity > 0 && stock > i64::from(w.capacity) {
            suggestions.push(Suggestion {
                kind: SuggestionKind::OverCapacity,
                priority: Priority::Medium,
                message: format!(
                    "Warehouse at {} holds {} units against a capacity of {}; move stock elsewhere.",
                    w.location, stock, w.capacity
                ),
                item_id: None,
                warehouse_id: Some(w.warehouse_id),
            });
        } else if stock == 0 {
            suggestions.push(Suggestion {
                kind: SuggestionKind::EmptyWarehouse,
                priority: Priority::Low,
                message: format!("Warehouse at {} holds no stock.", w.location),
                item_id: None,
                warehouse_id: Some(w.warehouse_id),
            });
        }
    }

    suggestions.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.kind.cmp(&b.kind)));
    suggestions
}
