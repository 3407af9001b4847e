use crate::config::Config;
use crate::error::{ReliefError, Result};
use crate::partition::models::{
    check_available, remaining_after, validate_distribution, validate_resources, Beneficiary,
    BeneficiaryFields, Distribution, DistributionDetail, ItemFields, ItemWithWarehouse,
    PartitionDetail, PartitionSnapshot, ReliefItem, Warehouse, WarehouseFields,
};
use crate::partition::retry::LockRetryPolicy;
use crate::partition::tables::{PartitionTable, PartitionTables};
use crate::pool::table_exists;
use chrono::NaiveDate;
use dashmap::DashMap;
use deadpool_postgres::Pool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Advisory lock class for partition DDL; the second key is the disaster id.
const PARTITION_LOCK_CLASS: i32 = 0x4452_4d53;

/// Cached schema handle for one disaster.
#[derive(Debug)]
pub struct PartitionHandle {
    pub tables: PartitionTables,
    ready: AtomicBool,
}

impl PartitionHandle {
    fn new(disaster_id: i32) -> Self {
        Self {
            tables: PartitionTables::for_disaster(disaster_id),
            ready: AtomicBool::new(false),
        }
    }

    pub fn disaster_id(&self) -> i32 {
        self.tables.disaster_id
    }

    /// True once this process has seen all four tables in the catalog.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }
}

pub struct PartitionManager {
    pool: Pool,
    partitions: DashMap<i32, Arc<PartitionHandle>>,
    retry: LockRetryPolicy,
    ddl_lock_timeout: Duration,
}

impl PartitionManager {
    pub fn new(pool: Pool, retry: LockRetryPolicy, ddl_lock_timeout: Duration) -> Self {
        Self {
            pool,
            partitions: DashMap::new(),
            retry,
            ddl_lock_timeout,
        }
    }

    pub fn from_config(pool: Pool, config: &Config) -> Self {
        Self::new(
            pool,
            LockRetryPolicy::new(config.table_setup_attempts, config.table_setup_base_delay),
            config.ddl_lock_timeout,
        )
    }

    /// Return the cached handle for `disaster_id`, building it on first use.
    ///
    /// Performs no I/O. The handle is in the cache before any table is created,
    /// so every caller in this process shares the same descriptor.
    pub fn get_or_create_partition(&self, disaster_id: i32) -> Arc<PartitionHandle> {
        if let Some(handle) = self.partitions.get(&disaster_id) {
            return handle.clone();
        }

        self.partitions
            .entry(disaster_id)
            .or_insert_with(|| {
                debug!("Built partition descriptor for disaster {}", disaster_id);
                Arc::new(PartitionHandle::new(disaster_id))
            })
            .clone()
    }

    pub fn cached_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Create whichever of the four tables are missing. Idempotent.
    ///
    /// Returns the number of tables created by this call.
    pub async fn ensure_tables_exist(&self, disaster_id: i32) -> Result<usize> {
        let handle = self.get_or_create_partition(disaster_id);

        if !handle.tables.is_valid() {
            return Err(ReliefError::validation(format!(
                "Invalid disaster id for partition tables: {}",
                disaster_id
            )));
        }

        let prefix = handle.tables.prefix();
        let created = self
            .retry
            .run(&prefix, || self.create_missing_tables(&handle))
            .await?;

        handle.mark_ready();
        Ok(created)
    }

    /// Handle for request paths: tables are checked once per process.
    pub async fn open(&self, disaster_id: i32) -> Result<Arc<PartitionHandle>> {
        let handle = self.get_or_create_partition(disaster_id);
        if !handle.is_ready() {
            self.ensure_tables_exist(disaster_id).await?;
        }
        Ok(handle)
    }

    async fn create_missing_tables(&self, handle: &PartitionHandle) -> Result<usize> {
        let tables = &handle.tables;
        let prefix = tables.prefix();

        let mut client = self.pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ReliefError::storage("begin table setup", e))?;

        // Bound how long DDL waits on locks held elsewhere; a timeout surfaces as 55P03.
        tx.batch_execute(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.ddl_lock_timeout.as_millis()
        ))
        .await
        .map_err(|e| ReliefError::storage("set lock_timeout", e))?;

        let acquired: bool = tx
            .query_one(
                "SELECT pg_try_advisory_xact_lock($1, $2)",
                &[&PARTITION_LOCK_CLASS, &tables.disaster_id],
            )
            .await
            .map_err(|e| ReliefError::storage(format!("advisory lock for {}", prefix), e))?
            .get(0);

        if !acquired {
            return Err(ReliefError::ResourceLocked {
                resource: prefix,
                cause: "table setup in progress in another session".to_string(),
            });
        }

        let mut missing = Vec::new();
        for table in PartitionTable::CREATION_ORDER {
            if !table_exists(&tx, tables.name(table)).await? {
                missing.push(table);
            }
        }

        if missing.is_empty() {
            debug!("Tables for {} already exist, skipping creation", prefix);
            return Ok(0);
        }

        for table in &missing {
            let name = tables.name(*table);
            tx.batch_execute(&tables.create_sql(*table))
                .await
                .map_err(|e| ReliefError::storage(format!("create {}", name), e))?;
            debug!("Created table {}", name);
        }

        tx.commit()
            .await
            .map_err(|e| ReliefError::storage(format!("commit table setup for {}", prefix), e))?;

        info!(
            "Created {} of {} tables for {}",
            missing.len(),
            PartitionTable::CREATION_ORDER.len(),
            prefix
        );

        Ok(missing.len())
    }

    /// Insert a warehouse and its first relief item in one transaction.
    pub async fn add_warehouse_and_item(
        &self,
        disaster_id: i32,
        warehouse: WarehouseFields,
        item: ItemFields,
    ) -> Result<(i32, i32)> {
        validate_resources(&warehouse, &item)?;

        let handle = self.open(disaster_id).await?;
        let tables = &handle.tables;

        let mut client = self.pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ReliefError::storage("begin add resources", e))?;

        let warehouse_id: i32 = tx
            .query_one(
                &tables.insert_warehouse_sql(),
                &[&warehouse.location.trim(), &warehouse.capacity.max(0)],
            )
            .await
            .map_err(|e| ReliefError::storage(format!("insert into {}", tables.warehouse), e))?
            .get(0);

        let item_id: i32 = tx
            .query_one(
                &tables.insert_item_sql(),
                &[&warehouse_id, &item.name.trim(), &item.category, &item.quantity],
            )
            .await
            .map_err(|e| ReliefError::storage(format!("insert into {}", tables.relief_item), e))?
            .get(0);

        tx.commit()
            .await
            .map_err(|e| ReliefError::storage("commit add resources", e))?;

        info!(
            "Disaster {}: added warehouse {} with item {} ({} x {})",
            disaster_id,
            warehouse_id,
            item_id,
            item.quantity,
            item.name.trim()
        );

        Ok((warehouse_id, item_id))
    }

    /// Record a hand-out: new beneficiary, distribution row and stock decrement,
    /// all committed together.
    pub async fn record_distribution(
        &self,
        disaster_id: i32,
        beneficiary: BeneficiaryFields,
        item_id: i32,
        quantity: i32,
        date: NaiveDate,
    ) -> Result<i32> {
        validate_distribution(&beneficiary, quantity)?;

        let handle = self.open(disaster_id).await?;
        let tables = &handle.tables;

        let mut client = self.pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ReliefError::storage("begin distribution", e))?;

        let available: i32 = match tx
            .query_opt(&tables.lock_item_sql(), &[&item_id])
            .await
            .map_err(|e| ReliefError::storage(format!("lock item in {}", tables.relief_item), e))?
        {
            Some(row) => row.get(0),
            None => {
                return Err(ReliefError::ItemNotFound {
                    disaster_id,
                    item_id,
                })
            }
        };

        check_available(item_id, available, quantity)?;

        let beneficiary_id: i32 = tx
            .query_one(
                &tables.insert_beneficiary_sql(),
                &[
                    &beneficiary.name.trim(),
                    &beneficiary.location,
                    &beneficiary.contact,
                ],
            )
            .await
            .map_err(|e| ReliefError::storage(format!("insert into {}", tables.beneficiary), e))?
            .get(0);

        let dist_id: i32 = tx
            .query_one(
                &tables.insert_distribution_sql(),
                &[&beneficiary_id, &item_id, &quantity, &date],
            )
            .await
            .map_err(|e| ReliefError::storage(format!("insert into {}", tables.distribution), e))?
            .get(0);

        let remaining = remaining_after(available, quantity);
        tx.execute(&tables.set_item_quantity_sql(), &[&remaining, &item_id])
            .await
            .map_err(|e| ReliefError::storage(format!("update {}", tables.relief_item), e))?;

        tx.commit()
            .await
            .map_err(|e| ReliefError::storage("commit distribution", e))?;

        info!(
            "Disaster {}: distribution {} of {} x item {} to beneficiary {} ({} left)",
            disaster_id, dist_id, quantity, item_id, beneficiary_id, remaining
        );

        Ok(dist_id)
    }

    /// Read-only dump of all four tables.
    pub async fn list_partition_data(&self, disaster_id: i32) -> Result<PartitionSnapshot> {
        let (_, snapshot) = self.open_with_snapshot(disaster_id).await?;
        Ok(snapshot)
    }

    /// Open the partition and read all four tables, returning the handle used.
    pub async fn open_with_snapshot(
        &self,
        disaster_id: i32,
    ) -> Result<(Arc<PartitionHandle>, PartitionSnapshot)> {
        let handle = self.open(disaster_id).await?;
        let snapshot = self.read_snapshot(&handle.tables).await?;
        Ok((handle, snapshot))
    }

    async fn read_snapshot(&self, tables: &PartitionTables) -> Result<PartitionSnapshot> {
        let client = self.pool.get().await?;

        let warehouses = client
            .query(&tables.select_warehouses_sql(), &[])
            .await
            .map_err(|e| ReliefError::storage(format!("select {}", tables.warehouse), e))?
            .iter()
            .map(Warehouse::from_row)
            .collect();

        let items = client
            .query(&tables.select_items_sql(), &[])
            .await
            .map_err(|e| ReliefError::storage(format!("select {}", tables.relief_item), e))?
            .iter()
            .map(ReliefItem::from_row)
            .collect();

        let beneficiaries = client
            .query(&tables.select_beneficiaries_sql(), &[])
            .await
            .map_err(|e| ReliefError::storage(format!("select {}", tables.beneficiary), e))?
            .iter()
            .map(Beneficiary::from_row)
            .collect();

        let distributions = client
            .query(&tables.select_distributions_sql(), &[])
            .await
            .map_err(|e| ReliefError::storage(format!("select {}", tables.distribution), e))?
            .iter()
            .map(Distribution::from_row)
            .collect();

        Ok(PartitionSnapshot {
            warehouses,
            items,
            beneficiaries,
            distributions,
        })
    }

    /// Items joined with their warehouse, as offered by the distribution form.
    pub async fn available_items(&self, disaster_id: i32) -> Result<Vec<ItemWithWarehouse>> {
        let handle = self.open(disaster_id).await?;
        let tables = &handle.tables;
        let client = self.pool.get().await?;

        let rows = client
            .query(&tables.select_items_with_warehouse_sql(), &[])
            .await
            .map_err(|e| ReliefError::storage(format!("select {}", tables.relief_item), e))?;

        Ok(rows.iter().map(ItemWithWarehouse::from_row).collect())
    }

    pub async fn detail(&self, disaster_id: i32) -> Result<PartitionDetail> {
        let handle = self.open(disaster_id).await?;
        let tables = &handle.tables;
        let client = self.pool.get().await?;

        let warehouses = client
            .query(&tables.select_warehouses_sql(), &[])
            .await
            .map_err(|e| ReliefError::storage(format!("select {}", tables.warehouse), e))?
            .iter()
            .map(Warehouse::from_row)
            .collect();

        let items = client
            .query(&tables.select_items_with_warehouse_sql(), &[])
            .await
            .map_err(|e| ReliefError::storage(format!("select {}", tables.relief_item), e))?
            .iter()
            .map(ItemWithWarehouse::from_row)
            .collect();

        let distributions = client
            .query(&tables.select_distribution_details_sql(), &[])
            .await
            .map_err(|e| ReliefError::storage(format!("select {}", tables.distribution), e))?
            .iter()
            .map(DistributionDetail::from_row)
            .collect();

        Ok(PartitionDetail {
            warehouses,
            items,
            distributions,
        })
    }
}
