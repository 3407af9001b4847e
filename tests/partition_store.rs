//! Database-backed tests for the registry and partition manager.
//!
//! Ignored by default. Run them with `cargo test -- --ignored` and
//! `DRMS_TEST_DATABASE_URL` pointing at a PostgreSQL database the tests may
//! create tables in. Without the variable each test prints a skip notice.

use chrono::NaiveDate;
use deadpool_postgres::Pool;
use drms::error::ReliefError;
use drms::partition::{
    BeneficiaryFields, ItemFields, LockRetryPolicy, PartitionManager, PartitionTables,
    WarehouseFields,
};
use drms::pool::create_pool;
use drms::registry::{DisasterFolders, DisasterRegistry, NewDisaster, SUBDIRECTORIES};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

struct Harness {
    pool: Pool,
    registry: DisasterRegistry,
    partitions: PartitionManager,
    _root: TempDir,
}

async fn harness() -> Option<Harness> {
    let Ok(url) = std::env::var("DRMS_TEST_DATABASE_URL") else {
        eprintln!("skipping: DRMS_TEST_DATABASE_URL is not set");
        return None;
    };
    let pool = create_pool(&url, 4, Duration::from_secs(5)).expect("test pool");

    let root = TempDir::new().expect("temp root");
    let registry = DisasterRegistry::new(pool.clone(), DisasterFolders::new(root.path()));
    registry
        .ensure_table()
        .await
        .expect("DRMS_TEST_DATABASE_URL is set but the disaster table could not be created");

    let partitions = PartitionManager::new(
        pool.clone(),
        LockRetryPolicy::new(3, Duration::from_millis(200)),
        Duration::from_secs(2),
    );

    Some(Harness {
        pool,
        registry,
        partitions,
        _root: root,
    })
}

fn new_disaster(name: &str, start_date: &str) -> NewDisaster {
    NewDisaster {
        name: Some(name.to_string()),
        start_date: Some(start_date.to_string()),
        ..Default::default()
    }
}

fn beneficiary(name: &str) -> BeneficiaryFields {
    BeneficiaryFields {
        name: name.to_string(),
        location: Some("Shelter A".to_string()),
        contact: None,
    }
}

/// Make every `event` on `table` raise, so the statement fails inside the
/// surrounding transaction.
async fn fail_on(pool: &Pool, table: &str, event: &str) {
    let client = pool.get().await.unwrap();
    client
        .batch_execute(&format!(
            "CREATE OR REPLACE FUNCTION {table}_fail() RETURNS trigger AS $$
             BEGIN
                 RAISE EXCEPTION 'forced failure on %', TG_TABLE_NAME;
             END;
             $$ LANGUAGE plpgsql;
             CREATE TRIGGER {table}_fail BEFORE {event} ON {table}
                 FOR EACH ROW EXECUTE FUNCTION {table}_fail();"
        ))
        .await
        .unwrap();
}

async fn count_rows(pool: &Pool, table: &str) -> i64 {
    let client = pool.get().await.unwrap();
    client
        .query_one(&format!("SELECT COUNT(*) FROM {}", table), &[])
        .await
        .unwrap()
        .get(0)
}

#[tokio::test]
#[ignore = "requires DRMS_TEST_DATABASE_URL"]
async fn flood_relief_scenario() {
    let Some(h) = harness().await else { return };

    let disaster = h
        .registry
        .register(new_disaster("Flood Relief 2024", "2024-03-01"))
        .await
        .unwrap();
    let id = disaster.disaster_id;

    let expected = format!("2024-flood-relief-2024-{}", id);
    let folder = Path::new(&disaster.folder_path);
    assert_eq!(folder.file_name().unwrap().to_str().unwrap(), expected);
    for sub in SUBDIRECTORIES {
        assert!(folder.join(sub).is_dir());
    }

    assert_eq!(h.partitions.ensure_tables_exist(id).await.unwrap(), 4);

    let (warehouse_id, item_id) = h
        .partitions
        .add_warehouse_and_item(
            id,
            WarehouseFields {
                location: "Central Depot".to_string(),
                capacity: 1000,
            },
            ItemFields {
                name: "Rice".to_string(),
                category: Some("Food".to_string()),
                quantity: 500,
            },
        )
        .await
        .unwrap();

    let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
    assert_ok!(
        h.partitions
            .record_distribution(id, beneficiary("Jane Doe"), item_id, 50, date)
            .await
    );

    let snapshot = h.partitions.list_partition_data(id).await.unwrap();
    assert_eq!(snapshot.items[0].quantity, 450);
    assert_eq!(snapshot.items[0].warehouse_id, warehouse_id);
    assert_eq!(snapshot.distributions.len(), 1);

    let err = h
        .partitions
        .record_distribution(id, beneficiary("John Roe"), item_id, 1000, date)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReliefError::InsufficientInventory {
            available: 450,
            requested: 1000,
            ..
        }
    ));

    let snapshot = h.partitions.list_partition_data(id).await.unwrap();
    assert_eq!(snapshot.items[0].quantity, 450);
    assert_eq!(snapshot.beneficiaries.len(), 1);
    assert_eq!(snapshot.distributions.len(), 1);

    let detail = h.partitions.detail(id).await.unwrap();
    assert_eq!(detail.items[0].warehouse_location, "Central Depot");
    assert_eq!(detail.distributions[0].beneficiary_name, "Jane Doe");
    assert_eq!(detail.distributions[0].item_name, "Rice");
}

#[tokio::test]
#[ignore = "requires DRMS_TEST_DATABASE_URL"]
async fn ensure_tables_is_idempotent() {
    let Some(h) = harness().await else { return };

    let disaster = h
        .registry
        .register(new_disaster("Wildfire", "2023-08-10"))
        .await
        .unwrap();
    let id = disaster.disaster_id;

    assert_eq!(h.partitions.ensure_tables_exist(id).await.unwrap(), 4);
    assert_eq!(h.partitions.ensure_tables_exist(id).await.unwrap(), 0);
    assert!(h.partitions.get_or_create_partition(id).is_ready());

    // A second manager with a cold cache sees the tables in the catalog.
    let cold = PartitionManager::new(
        h.pool.clone(),
        LockRetryPolicy::default(),
        Duration::from_secs(2),
    );
    assert_eq!(cold.ensure_tables_exist(id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires DRMS_TEST_DATABASE_URL"]
async fn concurrent_setup_creates_tables_once() {
    let Some(h) = harness().await else { return };

    let disaster = h
        .registry
        .register(new_disaster("Earthquake", "2023-02-06"))
        .await
        .unwrap();
    let id = disaster.disaster_id;

    let (a, b) = tokio::join!(
        h.partitions.ensure_tables_exist(id),
        h.partitions.ensure_tables_exist(id)
    );
    assert_eq!(a.unwrap() + b.unwrap(), 4);
}

#[tokio::test]
#[ignore = "requires DRMS_TEST_DATABASE_URL"]
async fn validation_failures_persist_nothing() {
    let Some(h) = harness().await else { return };

    let before = count_rows(&h.pool, "disaster").await;
    assert_err!(h.registry.register(new_disaster("", "2024-01-01")).await);
    assert_err!(h.registry.register(new_disaster("Storm", "not-a-date")).await);
    assert_eq!(count_rows(&h.pool, "disaster").await, before);

    let disaster = h
        .registry
        .register(new_disaster("Storm", "2024-01-01"))
        .await
        .unwrap();
    let id = disaster.disaster_id;

    let err = h
        .partitions
        .add_warehouse_and_item(
            id,
            WarehouseFields {
                location: "Depot".to_string(),
                capacity: 10,
            },
            ItemFields {
                name: "Water".to_string(),
                category: None,
                quantity: 0,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReliefError::Validation { .. }));

    let snapshot = h.partitions.list_partition_data(id).await.unwrap();
    assert!(snapshot.warehouses.is_empty());
    assert!(snapshot.items.is_empty());
}

#[tokio::test]
#[ignore = "requires DRMS_TEST_DATABASE_URL"]
async fn failed_item_insert_rolls_back_warehouse() {
    let Some(h) = harness().await else { return };

    let disaster = h
        .registry
        .register(new_disaster("Landslide", "2024-05-20"))
        .await
        .unwrap();
    let id = disaster.disaster_id;
    let tables = PartitionTables::for_disaster(id);

    assert_ok!(h.partitions.ensure_tables_exist(id).await);
    fail_on(&h.pool, &tables.relief_item, "INSERT").await;

    let err = h
        .partitions
        .add_warehouse_and_item(
            id,
            WarehouseFields {
                location: "Hill Camp".to_string(),
                capacity: 100,
            },
            ItemFields {
                name: "Blankets".to_string(),
                category: None,
                quantity: 5,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReliefError::Storage { .. }));

    let snapshot = h.partitions.list_partition_data(id).await.unwrap();
    assert!(snapshot.warehouses.is_empty());
    assert!(snapshot.items.is_empty());
}

#[tokio::test]
#[ignore = "requires DRMS_TEST_DATABASE_URL"]
async fn over_long_input_is_a_validation_error() {
    let Some(h) = harness().await else { return };

    let err = h
        .registry
        .register(new_disaster(&"f".repeat(201), "2024-04-01"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReliefError::Validation { .. }));

    let disaster = h
        .registry
        .register(new_disaster("Mudslide", "2024-04-01"))
        .await
        .unwrap();
    let id = disaster.disaster_id;

    let err = h
        .partitions
        .add_warehouse_and_item(
            id,
            WarehouseFields {
                location: "Ridge".to_string(),
                capacity: 10,
            },
            ItemFields {
                name: "x".repeat(151),
                category: None,
                quantity: 5,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReliefError::Validation { .. }));

    let date = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
    let err = h
        .partitions
        .record_distribution(id, beneficiary(&"y".repeat(201)), 1, 5, date)
        .await
        .unwrap_err();
    assert!(matches!(err, ReliefError::Validation { .. }));

    // The widest accepted values fit their columns.
    assert_ok!(
        h.partitions
            .add_warehouse_and_item(
                id,
                WarehouseFields {
                    location: "l".repeat(200),
                    capacity: 10,
                },
                ItemFields {
                    name: "é".repeat(150),
                    category: Some("c".repeat(100)),
                    quantity: 5,
                },
            )
            .await
    );
}

#[tokio::test]
#[ignore = "requires DRMS_TEST_DATABASE_URL"]
async fn failed_distribution_leaves_stock_untouched() {
    let Some(h) = harness().await else { return };

    let disaster = h
        .registry
        .register(new_disaster("Cyclone", "2024-06-01"))
        .await
        .unwrap();
    let id = disaster.disaster_id;

    let (_, item_id) = h
        .partitions
        .add_warehouse_and_item(
            id,
            WarehouseFields {
                location: "Port".to_string(),
                capacity: 0,
            },
            ItemFields {
                name: "Tarp".to_string(),
                category: None,
                quantity: 20,
            },
        )
        .await
        .unwrap();

    let date = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
    let tables = PartitionTables::for_disaster(id);

    // The beneficiary and distribution rows go in; the stock decrement fails.
    fail_on(&h.pool, &tables.relief_item, "UPDATE").await;
    let err = h
        .partitions
        .record_distribution(id, beneficiary("Jane Doe"), item_id, 5, date)
        .await
        .unwrap_err();
    assert!(matches!(err, ReliefError::Storage { .. }));

    let err = h
        .partitions
        .record_distribution(id, beneficiary("Jane Doe"), item_id + 100, 5, date)
        .await
        .unwrap_err();
    assert!(matches!(err, ReliefError::ItemNotFound { .. }));

    let snapshot = h.partitions.list_partition_data(id).await.unwrap();
    assert_eq!(snapshot.items[0].quantity, 20);
    assert!(snapshot.beneficiaries.is_empty());
    assert!(snapshot.distributions.is_empty());
}

#[tokio::test]
#[ignore = "requires DRMS_TEST_DATABASE_URL"]
async fn unknown_disaster_is_not_found() {
    let Some(h) = harness().await else { return };

    let err = h.registry.get(i32::MAX).await.unwrap_err();
    assert!(matches!(err, ReliefError::DisasterNotFound { .. }));
}

#[tokio::test]
#[ignore = "requires DRMS_TEST_DATABASE_URL"]
async fn tables_and_data_come_from_one_open() {
    let Some(h) = harness().await else { return };

    let disaster = h
        .registry
        .register(new_disaster("Heatwave", "2024-07-15"))
        .await
        .unwrap();
    let id = disaster.disaster_id;

    let (handle, snapshot) = h.partitions.open_with_snapshot(id).await.unwrap();
    assert!(handle.is_ready());
    assert_eq!(handle.tables, PartitionTables::for_disaster(id));
    assert!(snapshot.warehouses.is_empty());
    assert_eq!(h.partitions.cached_partitions(), 1);
}
