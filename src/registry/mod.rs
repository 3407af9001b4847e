//! Disaster Registry
//!
//! The shared `disaster` table plus the folder tree kept for each disaster
//! under the configured disasters root.

mod disaster;
mod folders;

pub use disaster::{
    check_length, check_optional_length, non_empty, parse_date, Disaster, DisasterRegistry,
    NewDisaster, ValidDisaster, MAX_YEAR, MIN_YEAR,
};
pub use folders::{folder_name, slugify, DisasterFolders, SUBDIRECTORIES};
