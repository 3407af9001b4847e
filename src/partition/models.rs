use crate::error::{ReliefError, Result};
use crate::registry::{check_length, check_optional_length};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// Column widths shared by the partition DDL and input validation.
pub const LOCATION_MAX_LEN: usize = 200;
pub const ITEM_NAME_MAX_LEN: usize = 150;
pub const CATEGORY_MAX_LEN: usize = 100;
pub const BENEFICIARY_NAME_MAX_LEN: usize = 200;
pub const CONTACT_MAX_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub warehouse_id: i32,
    pub location: String,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
}

impl Warehouse {
    pub fn from_row(row: &Row) -> Self {
        Self {
            warehouse_id: row.get("warehouse_id"),
            location: row.get("location"),
            capacity: row.get("capacity"),
            created_at: row.get("created_at"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliefItem {
    pub item_id: i32,
    pub warehouse_id: i32,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl ReliefItem {
    pub fn from_row(row: &Row) -> Self {
        Self {
            item_id: row.get("item_id"),
            warehouse_id: row.get("warehouse_id"),
            name: row.get("name"),
            category: row.get("category"),
            quantity: row.get("quantity"),
            created_at: row.get("created_at"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub beneficiary_id: i32,
    pub name: String,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Beneficiary {
    pub fn from_row(row: &Row) -> Self {
        Self {
            beneficiary_id: row.get("beneficiary_id"),
            name: row.get("name"),
            location: row.get("location"),
            contact: row.get("contact"),
            created_at: row.get("created_at"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub dist_id: i32,
    pub beneficiary_id: i32,
    pub item_id: i32,
    pub quantity: i32,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Distribution {
    pub fn from_row(row: &Row) -> Self {
        Self {
            dist_id: row.get("dist_id"),
            beneficiary_id: row.get("beneficiary_id"),
            item_id: row.get("item_id"),
            quantity: row.get("quantity"),
            date: row.get("date"),
            created_at: row.get("created_at"),
        }
    }
}

/// Relief item joined with the location of the warehouse holding it.
#[derive(Debug, Clone, Serialize)]
pub struct ItemWithWarehouse {
    #[serde(flatten)]
    pub item: ReliefItem,
    pub warehouse_location: String,
}

impl ItemWithWarehouse {
    pub fn from_row(row: &Row) -> Self {
        Self {
            item: ReliefItem::from_row(row),
            warehouse_location: row.get("warehouse_location"),
        }
    }
}

/// Distribution joined with the beneficiary and item it refers to.
#[derive(Debug, Clone, Serialize)]
pub struct DistributionDetail {
    #[serde(flatten)]
    pub distribution: Distribution,
    pub beneficiary_name: String,
    pub item_name: String,
}

impl DistributionDetail {
    pub fn from_row(row: &Row) -> Self {
        Self {
            distribution: Distribution::from_row(row),
            beneficiary_name: row.get("beneficiary_name"),
            item_name: row.get("item_name"),
        }
    }
}

/// Full contents of one partition.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartitionSnapshot {
    pub warehouses: Vec<Warehouse>,
    pub items: Vec<ReliefItem>,
    pub beneficiaries: Vec<Beneficiary>,
    /// Newest first.
    pub distributions: Vec<Distribution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionDetail {
    pub warehouses: Vec<Warehouse>,
    pub items: Vec<ItemWithWarehouse>,
    pub distributions: Vec<DistributionDetail>,
}

#[derive(Debug, Clone)]
pub struct WarehouseFields {
    pub location: String,
    pub capacity: i32,
}

#[derive(Debug, Clone)]
pub struct ItemFields {
    pub name: String,
    pub category: Option<String>,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct BeneficiaryFields {
    pub name: String,
    pub location: Option<String>,
    pub contact: Option<String>,
}

pub fn validate_resources(warehouse: &WarehouseFields, item: &ItemFields) -> Result<()> {
    if warehouse.location.trim().is_empty() || item.name.trim().is_empty() || item.quantity <= 0 {
        return Err(ReliefError::validation(
            "Warehouse location, item name and positive quantity are required.",
        ));
    }

    check_length("Warehouse location", warehouse.location.trim(), LOCATION_MAX_LEN)?;
    check_length("Item name", item.name.trim(), ITEM_NAME_MAX_LEN)?;
    check_optional_length("Item category", &item.category, CATEGORY_MAX_LEN)?;
    Ok(())
}

pub fn validate_distribution(beneficiary: &BeneficiaryFields, quantity: i32) -> Result<()> {
    if beneficiary.name.trim().is_empty() || quantity <= 0 {
        return Err(ReliefError::validation(
            "Beneficiary name and positive quantity are required.",
        ));
    }

    check_length("Beneficiary name", beneficiary.name.trim(), BENEFICIARY_NAME_MAX_LEN)?;
    check_optional_length("Beneficiary location", &beneficiary.location, LOCATION_MAX_LEN)?;
    check_optional_length("Beneficiary contact", &beneficiary.contact, CONTACT_MAX_LEN)?;
    Ok(())
}

pub fn check_available(item_id: i32, available: i32, requested: i32) -> Result<()> {
    if available < requested {
        return Err(ReliefError::InsufficientInventory {
            item_id,
            available,
            requested,
        });
    }
    Ok(())
}

/// Stock left after a distribution, never below zero.
pub fn remaining_after(available: i32, distributed: i32) -> i32 {
    available.saturating_sub(distributed).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beneficiary(name: &str) -> BeneficiaryFields {
        BeneficiaryFields {
            name: name.to_string(),
            location: None,
            contact: None,
        }
    }

    #[test]
    fn test_validate_resources() {
        let warehouse = WarehouseFields {
            location: "Central Depot".to_string(),
            capacity: 100,
        };
        let item = ItemFields {
            name: "Rice".to_string(),
            category: Some("Food".to_string()),
            quantity: 500,
        };
        assert!(validate_resources(&warehouse, &item).is_ok());

        let blank_location = WarehouseFields {
            location: "   ".to_string(),
            ..warehouse.clone()
        };
        assert!(validate_resources(&blank_location, &item).is_err());

        let blank_name = ItemFields {
            name: String::new(),
            ..item.clone()
        };
        assert!(validate_resources(&warehouse, &blank_name).is_err());

        let zero_quantity = ItemFields {
            quantity: 0,
            ..item.clone()
        };
        let err = validate_resources(&warehouse, &zero_quantity).unwrap_err();
        assert!(matches!(err, ReliefError::Validation { .. }));
    }

    #[test]
    fn test_validate_distribution() {
        assert!(validate_distribution(&beneficiary("Jane Doe"), 50).is_ok());
        assert!(validate_distribution(&beneficiary(""), 50).is_err());
        assert!(validate_distribution(&beneficiary("Jane Doe"), 0).is_err());
        assert!(validate_distribution(&beneficiary("Jane Doe"), -5).is_err());
    }

    #[test]
    fn test_validate_resources_column_widths() {
        let warehouse = WarehouseFields {
            location: "Depot".to_string(),
            capacity: 10,
        };
        let item = |name: String, category: Option<String>| ItemFields {
            name,
            category,
            quantity: 5,
        };

        assert!(validate_resources(&warehouse, &item("x".repeat(150), None)).is_ok());

        let err = validate_resources(&warehouse, &item("x".repeat(151), None)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: Item name must be at most 150 characters."
        );

        let long_category = item("Rice".to_string(), Some("c".repeat(101)));
        assert!(matches!(
            validate_resources(&warehouse, &long_category),
            Err(ReliefError::Validation { .. })
        ));

        let wide_location = WarehouseFields {
            location: "l".repeat(201),
            capacity: 10,
        };
        assert!(validate_resources(&wide_location, &item("Rice".to_string(), None)).is_err());
    }

    #[test]
    fn test_validate_distribution_column_widths() {
        assert!(validate_distribution(&beneficiary(&"y".repeat(200)), 1).is_ok());
        assert!(matches!(
            validate_distribution(&beneficiary(&"y".repeat(201)), 1),
            Err(ReliefError::Validation { .. })
        ));

        let with_contact = BeneficiaryFields {
            contact: Some("5".repeat(101)),
            ..beneficiary("Jane Doe")
        };
        assert!(validate_distribution(&with_contact, 1).is_err());

        let with_location = BeneficiaryFields {
            location: Some("l".repeat(201)),
            ..beneficiary("Jane Doe")
        };
        assert!(validate_distribution(&with_location, 1).is_err());
    }

    #[test]
    fn test_check_available() {
        assert!(check_available(1, 500, 50).is_ok());
        assert!(check_available(1, 50, 50).is_ok());

        match check_available(1, 450, 1000) {
            Err(ReliefError::InsufficientInventory {
                item_id,
                available,
                requested,
            }) => {
                assert_eq!(item_id, 1);
                assert_eq!(available, 450);
                assert_eq!(requested, 1000);
            }
            other => panic!("expected insufficient inventory, got {:?}", other),
        }
    }

    #[test]
    fn test_remaining_after_floors_at_zero() {
        assert_eq!(remaining_after(500, 50), 450);
        assert_eq!(remaining_after(50, 50), 0);
        assert_eq!(remaining_after(10, 20), 0);
        assert_eq!(remaining_after(i32::MIN, 1), 0);
    }
}
