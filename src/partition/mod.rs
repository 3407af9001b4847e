//! Tenant Partition Manager
//!
//! Maps a disaster id to its own group of four tables and owns the
//! process-wide cache of table descriptors.

mod manager;
pub mod models;
mod retry;
mod tables;

pub use manager::{PartitionHandle, PartitionManager};
pub use models::{
    Beneficiary, BeneficiaryFields, Distribution, DistributionDetail, ItemFields,
    ItemWithWarehouse, PartitionDetail, PartitionSnapshot, ReliefItem, Warehouse,
    WarehouseFields,
};
pub use retry::LockRetryPolicy;
pub use tables::{PartitionTable, PartitionTables};
