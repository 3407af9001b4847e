//! On-disk folder tree kept alongside each disaster row.
//!
//! ```text
//! {disasters_root}/{YYYY}-{slug}-{id}/
//!   ├── intake/
//!   ├── shipments/
//!   ├── distributions/
//!   └── attachments/
//! ```

use crate::error::{ReliefError, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SUBDIRECTORIES: [&str; 4] = ["intake", "shipments", "distributions", "attachments"];

/// Lowercase, keep alphanumerics, spaces and hyphens, join words with `-`.
pub fn slugify(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join("-")
}

pub fn folder_name(name: &str, start_date: NaiveDate, disaster_id: i32) -> String {
    format!(
        "{}-{}-{}",
        start_date.format("%Y"),
        slugify(name),
        disaster_id
    )
}

#[derive(Debug, Clone)]
pub struct DisasterFolders {
    root: PathBuf,
}

impl DisasterFolders {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| {
            ReliefError::Internal(format!(
                "Failed to create disasters root {:?}: {}",
                self.root, e
            ))
        })
    }

    pub fn path_for(&self, name: &str, start_date: NaiveDate, disaster_id: i32) -> PathBuf {
        self.root.join(folder_name(name, start_date, disaster_id))
    }

    /// Create the disaster folder and its fixed subdirectories. Idempotent.
    pub fn ensure(&self, name: &str, start_date: NaiveDate, disaster_id: i32) -> Result<PathBuf> {
        let path = self.path_for(name, start_date, disaster_id);

        for sub in SUBDIRECTORIES {
            fs::create_dir_all(path.join(sub)).map_err(|e| {
                ReliefError::Internal(format!("Failed to create {:?}/{}: {}", path, sub, e))
            })?;
        }

        debug!("Disaster folder ready: {:?}", path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Flood Relief 2024"), "flood-relief-2024");
        assert_eq!(slugify("  Cyclone   Idai!! "), "cyclone-idai");
        assert_eq!(slugify("Quake (North-East)"), "quake-north-east");
        assert_eq!(slugify("Tab\tSeparated"), "tabseparated");
        assert_eq!(slugify("Séisme Haïti"), "séisme-haïti");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_folder_name() {
        assert_eq!(
            folder_name("Flood Relief 2024", date(2024, 3, 1), 17),
            "2024-flood-relief-2024-17"
        );
    }

    #[test]
    fn test_folder_name_is_unique_per_id() {
        let a = folder_name("Flood", date(2024, 3, 1), 1);
        let b = folder_name("Flood", date(2024, 3, 1), 2);
        assert_ne!(a, b);
        assert_eq!(a, folder_name("Flood", date(2024, 3, 1), 1));
    }

    #[test]
    fn test_ensure_creates_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let folders = DisasterFolders::new(&temp_dir.path().join("Disasters"));
        folders.ensure_root().unwrap();

        let path = folders
            .ensure("Flood Relief 2024", date(2024, 3, 1), 3)
            .unwrap();

        assert_eq!(path, temp_dir.path().join("Disasters/2024-flood-relief-2024-3"));
        for sub in SUBDIRECTORIES {
            assert!(path.join(sub).is_dir(), "missing {}", sub);
        }

        // Second call is a no-op
        assert_eq!(
            folders.ensure("Flood Relief 2024", date(2024, 3, 1), 3).unwrap(),
            path
        );
    }

    #[test]
    fn test_ensure_reports_unwritable_root() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not_a_dir");
        fs::write(&blocker, "file").unwrap();

        let folders = DisasterFolders::new(&blocker);
        assert!(folders.ensure("Flood", date(2024, 3, 1), 1).is_err());
    }
}
