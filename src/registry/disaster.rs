//! Disaster Registry
//!
//! One row per disaster in the shared `disaster` table. Registration is
//! two-phase inside a single transaction: insert to obtain the id, derive the
//! folder from that id, then store the folder path before committing.

use crate::error::{ReliefError, Result};
use crate::registry::folders::DisasterFolders;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use tracing::info;

/// Years accepted for any date field.
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

const NAME_MAX_LEN: usize = 200;
const TYPE_MAX_LEN: usize = 100;
const LOCATION_MAX_LEN: usize = 200;
const SEVERITY_MAX_LEN: usize = 50;
const FOLDER_PATH_MAX_LEN: usize = 500;

/// Advisory lock serializing `disaster` table creation across sessions.
const REGISTRY_LOCK_KEY: i64 = 0x4452_4d53_5245_4749;

const DISASTER_COLUMNS: &str = "disaster_id, name, disaster_type, location, start_date, end_date, severity, folder_path, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disaster {
    pub disaster_id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub disaster_type: Option<String>,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub severity: Option<String>,
    pub folder_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Disaster {
    pub fn from_row(row: &Row) -> Self {
        Self {
            disaster_id: row.get("disaster_id"),
            name: row.get("name"),
            disaster_type: row.get("disaster_type"),
            location: row.get("location"),
            start_date: row.get("start_date"),
            end_date: row.get("end_date"),
            severity: row.get("severity"),
            folder_path: row
                .get::<_, Option<String>>("folder_path")
                .unwrap_or_default(),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// Raw registration input, as submitted by the disaster form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDisaster {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub disaster_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidDisaster {
    pub name: String,
    pub disaster_type: Option<String>,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub severity: Option<String>,
}

impl NewDisaster {
    pub fn validate(&self) -> Result<ValidDisaster> {
        let name = non_empty(&self.name);
        let start_date = non_empty(&self.start_date);

        let (name, start_date) = match (name, start_date) {
            (Some(name), Some(start_date)) => (name, start_date),
            _ => return Err(ReliefError::validation("Name and Start Date are required.")),
        };

        let start_date = parse_date(&start_date)
            .ok_or_else(|| ReliefError::validation("Invalid Start Date format (YYYY-MM-DD)."))?;

        let end_date = match non_empty(&self.end_date) {
            Some(raw) => Some(
                parse_date(&raw)
                    .ok_or_else(|| ReliefError::validation("Invalid End Date format (YYYY-MM-DD)."))?,
            ),
            None => None,
        };

        let valid = ValidDisaster {
            name,
            disaster_type: non_empty(&self.disaster_type),
            location: non_empty(&self.location),
            start_date,
            end_date,
            severity: non_empty(&self.severity),
        };

        check_length("Name", &valid.name, NAME_MAX_LEN)?;
        check_optional_length("Type", &valid.disaster_type, TYPE_MAX_LEN)?;
        check_optional_length("Location", &valid.location, LOCATION_MAX_LEN)?;
        check_optional_length("Severity", &valid.severity, SEVERITY_MAX_LEN)?;

        Ok(valid)
    }
}

/// `YYYY-MM-DD` within [`MIN_YEAR`, `MAX_YEAR`].
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .filter(|d| (MIN_YEAR..=MAX_YEAR).contains(&d.year()))
}

/// Reject text longer than the column it is stored in.
pub fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(ReliefError::validation(format!(
            "{} must be at most {} characters.",
            field, max
        )));
    }
    Ok(())
}

pub fn check_optional_length(field: &str, value: &Option<String>, max: usize) -> Result<()> {
    match value {
        Some(v) => check_length(field, v, max),
        None => Ok(()),
    }
}

/// Trimmed value, or `None` when missing or blank.
pub fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub struct DisasterRegistry {
    pool: Pool,
    folders: DisasterFolders,
}

impl DisasterRegistry {
    pub fn new(pool: Pool, folders: DisasterFolders) -> Self {
        Self { pool, folders }
    }

    /// Create the `disaster` table and the folder root. Called once at startup.
    pub async fn ensure_table(&self) -> Result<()> {
        self.folders.ensure_root()?;

        let mut client = self.pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ReliefError::storage("begin disaster table setup", e))?;

        tx.execute("SELECT pg_advisory_xact_lock($1)", &[&REGISTRY_LOCK_KEY])
            .await
            .map_err(|e| ReliefError::storage("lock disaster table setup", e))?;

        tx.batch_execute(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS disaster (
                disaster_id SERIAL PRIMARY KEY,
                name VARCHAR({name}) NOT NULL,
                disaster_type VARCHAR({kind}),
                location VARCHAR({location}),
                start_date DATE NOT NULL,
                end_date DATE,
                severity VARCHAR({severity}),
                folder_path VARCHAR({folder}) UNIQUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            name = NAME_MAX_LEN,
            kind = TYPE_MAX_LEN,
            location = LOCATION_MAX_LEN,
            severity = SEVERITY_MAX_LEN,
            folder = FOLDER_PATH_MAX_LEN,
        ))
        .await
        .map_err(|e| ReliefError::storage("create disaster table", e))?;

        tx.commit()
            .await
            .map_err(|e| ReliefError::storage("commit disaster table setup", e))?;

        Ok(())
    }

    pub async fn register(&self, input: NewDisaster) -> Result<Disaster> {
        let valid = input.validate()?;

        let mut client = self.pool.get().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| ReliefError::storage("begin disaster registration", e))?;

        let disaster_id: i32 = tx
            .query_one(
                r#"
                INSERT INTO disaster (name, disaster_type, location, start_date, end_date, severity)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING disaster_id
                "#,
                &[
                    &valid.name,
                    &valid.disaster_type,
                    &valid.location,
                    &valid.start_date,
                    &valid.end_date,
                    &valid.severity,
                ],
            )
            .await
            .map_err(|e| ReliefError::storage("insert disaster", e))?
            .get(0);

        let folder = self
            .folders
            .ensure(&valid.name, valid.start_date, disaster_id)?;
        let folder_path = folder.to_string_lossy().to_string();

        let row = tx
            .query_one(
                &format!(
                    "UPDATE disaster SET folder_path = $1, updated_at = NOW() WHERE disaster_id = $2 RETURNING {}",
                    DISASTER_COLUMNS
                ),
                &[&folder_path, &disaster_id],
            )
            .await
            .map_err(|e| ReliefError::storage("store disaster folder path", e))?;

        tx.commit()
            .await
            .map_err(|e| ReliefError::storage("commit disaster registration", e))?;

        let disaster = Disaster::from_row(&row);
        info!(
            "Registered disaster {} '{}' at {}",
            disaster.disaster_id, disaster.name, disaster.folder_path
        );

        Ok(disaster)
    }

    pub async fn get(&self, disaster_id: i32) -> Result<Disaster> {
        let client = self.pool.get().await?;

        let row = client
            .query_opt(
                &format!(
                    "SELECT {} FROM disaster WHERE disaster_id = $1",
                    DISASTER_COLUMNS
                ),
                &[&disaster_id],
            )
            .await
            .map_err(|e| ReliefError::storage("select disaster", e))?;

        row.map(|r| Disaster::from_row(&r))
            .ok_or(ReliefError::DisasterNotFound { disaster_id })
    }

    /// All disasters, newest start date first.
    pub async fn list(&self) -> Result<Vec<Disaster>> {
        let client = self.pool.get().await?;

        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM disaster ORDER BY start_date DESC, disaster_id DESC",
                    DISASTER_COLUMNS
                ),
                &[],
            )
            .await
            .map_err(|e| ReliefError::storage("list disasters", e))?;

        Ok(rows.iter().map(Disaster::from_row).collect())
    }
}
