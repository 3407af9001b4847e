//! Disaster Relief Management Service
//!
//! Each registered disaster owns its own group of four PostgreSQL tables
//! (warehouses, relief items, beneficiaries, distributions) and a folder tree
//! on disk. This library holds the registry, the partition manager, the
//! analytics and the axum router; `main.rs` only wires them together.

pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod partition;
pub mod pool;
pub mod registry;
