//! Per-disaster table descriptors
//!
//! Every disaster owns four tables whose names embed the disaster id:
//!
//! ```text
//! disaster_{id}_warehouse
//! disaster_{id}_relief_item     -> warehouse
//! disaster_{id}_beneficiary
//! disaster_{id}_distribution    -> beneficiary, relief_item
//! ```
//!
//! `PartitionTables` is a plain value built by [`PartitionTables::for_disaster`];
//! two descriptors for the same id are always equal, so it does not matter which
//! one ends up in the partition cache.

use crate::partition::models::{
    BENEFICIARY_NAME_MAX_LEN, CATEGORY_MAX_LEN, CONTACT_MAX_LEN, ITEM_NAME_MAX_LEN, LOCATION_MAX_LEN,
};
use crate::pool::is_valid_identifier;

/// The four tables of a partition, in foreign-key creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionTable {
    Warehouse,
    ReliefItem,
    Beneficiary,
    Distribution,
}

impl PartitionTable {
    pub const CREATION_ORDER: [PartitionTable; 4] = [
        PartitionTable::Warehouse,
        PartitionTable::ReliefItem,
        PartitionTable::Beneficiary,
        PartitionTable::Distribution,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            PartitionTable::Warehouse => "warehouse",
            PartitionTable::ReliefItem => "relief_item",
            PartitionTable::Beneficiary => "beneficiary",
            PartitionTable::Distribution => "distribution",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTables {
    pub disaster_id: i32,
    pub warehouse: String,
    pub relief_item: String,
    pub beneficiary: String,
    pub distribution: String,
}

impl PartitionTables {
    pub fn for_disaster(disaster_id: i32) -> Self {
        let prefix = table_prefix(disaster_id);
        let name = |table: PartitionTable| format!("{}_{}", prefix, table.suffix());

        Self {
            disaster_id,
            warehouse: name(PartitionTable::Warehouse),
            relief_item: name(PartitionTable::ReliefItem),
            beneficiary: name(PartitionTable::Beneficiary),
            distribution: name(PartitionTable::Distribution),
        }
    }

    pub fn prefix(&self) -> String {
        table_prefix(self.disaster_id)
    }

    pub fn name(&self, table: PartitionTable) -> &str {
        match table {
            PartitionTable::Warehouse => &self.warehouse,
            PartitionTable::ReliefItem => &self.relief_item,
            PartitionTable::Beneficiary => &self.beneficiary,
            PartitionTable::Distribution => &self.distribution,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        PartitionTable::CREATION_ORDER
            .iter()
            .map(|t| self.name(*t))
            .collect()
    }

    /// All generated names are plain lowercase identifiers.
    pub fn is_valid(&self) -> bool {
        self.names().into_iter().all(is_valid_identifier)
    }

    pub fn create_sql(&self, table: PartitionTable) -> String {
        match table {
            PartitionTable::Warehouse => format!(
                r#"
                CREATE TABLE IF NOT EXISTS {warehouse} (
                    warehouse_id SERIAL PRIMARY KEY,
                    location VARCHAR({location}) NOT NULL,
                    capacity INTEGER NOT NULL DEFAULT 0 CHECK (capacity >= 0),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                warehouse = self.warehouse,
                location = LOCATION_MAX_LEN
            ),
            PartitionTable::ReliefItem => format!(
                r#"
                CREATE TABLE IF NOT EXISTS {item} (
                    item_id SERIAL PRIMARY KEY,
                    warehouse_id INTEGER NOT NULL REFERENCES {warehouse} (warehouse_id),
                    name VARCHAR({name}) NOT NULL,
                    category VARCHAR({category}),
                    quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                item = self.relief_item,
                warehouse = self.warehouse,
                name = ITEM_NAME_MAX_LEN,
                category = CATEGORY_MAX_LEN
            ),
            PartitionTable::Beneficiary => format!(
                r#"
                CREATE TABLE IF NOT EXISTS {beneficiary} (
                    beneficiary_id SERIAL PRIMARY KEY,
                    name VARCHAR({name}) NOT NULL,
                    location VARCHAR({location}),
                    contact VARCHAR({contact}),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                beneficiary = self.beneficiary,
                name = BENEFICIARY_NAME_MAX_LEN,
                location = LOCATION_MAX_LEN,
                contact = CONTACT_MAX_LEN
            ),
            PartitionTable::Distribution => format!(
                r#"
                CREATE TABLE IF NOT EXISTS {distribution} (
                    dist_id SERIAL PRIMARY KEY,
                    beneficiary_id INTEGER NOT NULL REFERENCES {beneficiary} (beneficiary_id),
                    item_id INTEGER NOT NULL REFERENCES {item} (item_id),
                    quantity INTEGER NOT NULL CHECK (quantity > 0),
                    date DATE NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                distribution = self.distribution,
                beneficiary = self.beneficiary,
                item = self.relief_item
            ),
        }
    }

    pub fn insert_warehouse_sql(&self) -> String {
        format!(
            "INSERT INTO {} (location, capacity) VALUES ($1, $2) RETURNING warehouse_id",
            self.warehouse
        )
    }

    pub fn insert_item_sql(&self) -> String {
        format!(
            "INSERT INTO {} (warehouse_id, name, category, quantity) VALUES ($1, $2, $3, $4) RETURNING item_id",
            self.relief_item
        )
    }

    pub fn insert_beneficiary_sql(&self) -> String {
        format!(
            "INSERT INTO {} (name, location, contact) VALUES ($1, $2, $3) RETURNING beneficiary_id",
            self.beneficiary
        )
    }

    pub fn insert_distribution_sql(&self) -> String {
        format!(
            "INSERT INTO {} (beneficiary_id, item_id, quantity, date) VALUES ($1, $2, $3, $4) RETURNING dist_id",
            self.distribution
        )
    }

    /// Row-locking stock lookup used inside the distribution transaction.
    pub fn lock_item_sql(&self) -> String {
        format!(
            "SELECT quantity FROM {} WHERE item_id = $1 FOR UPDATE",
            self.relief_item
        )
    }

    pub fn set_item_quantity_sql(&self) -> String {
        format!(
            "UPDATE {} SET quantity = $1 WHERE item_id = $2",
            self.relief_item
        )
    }

    pub fn select_warehouses_sql(&self) -> String {
        format!(
            "SELECT warehouse_id, location, capacity, created_at FROM {} ORDER BY warehouse_id",
            self.warehouse
        )
    }

    pub fn select_items_sql(&self) -> String {
        format!(
            "SELECT item_id, warehouse_id, name, category, quantity, created_at FROM {} ORDER BY item_id",
            self.relief_item
        )
    }

    pub fn select_beneficiaries_sql(&self) -> String {
        format!(
            "SELECT beneficiary_id, name, location, contact, created_at FROM {} ORDER BY beneficiary_id",
            self.beneficiary
        )
    }

    pub fn select_distributions_sql(&self) -> String {
        format!(
            "SELECT dist_id, beneficiary_id, item_id, quantity, date, created_at FROM {} ORDER BY date DESC, dist_id DESC",
            self.distribution
        )
    }

    pub fn select_items_with_warehouse_sql(&self) -> String {
        format!(
            r#"
            SELECT i.item_id, i.warehouse_id, i.name, i.category, i.quantity, i.created_at,
                   w.location AS warehouse_location
            FROM {item} i
            JOIN {warehouse} w ON w.warehouse_id = i.warehouse_id
            ORDER BY i.item_id
            "#,
            item = self.relief_item,
            warehouse = self.warehouse
        )
    }

    pub fn select_distribution_details_sql(&self) -> String {
        format!(
            r#"
            SELECT d.dist_id, d.beneficiary_id, d.item_id, d.quantity, d.date, d.created_at,
                   b.name AS beneficiary_name, i.name AS item_name
            FROM {distribution} d
            JOIN {beneficiary} b ON b.beneficiary_id = d.beneficiary_id
            JOIN {item} i ON i.item_id = d.item_id
            ORDER BY d.date DESC, d.dist_id DESC
            "#,
            distribution = self.distribution,
            beneficiary = self.beneficiary,
            item = self.relief_item
        )
    }
}

fn table_prefix(disaster_id: i32) -> String {
    format!("disaster_{}", disaster_id)
}
