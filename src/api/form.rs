//! Helpers for reading url-encoded form fields.
//!
//! Every form field arrives as an optional string; blank values count as
//! missing.

use crate::error::{ReliefError, Result};
use crate::registry::{non_empty, parse_date};
use chrono::NaiveDate;

/// Parse an integer field, using `default` when the field is blank or absent.
pub fn int_or(field: &str, value: &Option<String>, default: i32) -> Result<i32> {
    match non_empty(value) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ReliefError::validation(format!("{} must be a whole number.", field))),
        None => Ok(default),
    }
}

pub fn required_int(field: &str, value: &Option<String>) -> Result<i32> {
    match non_empty(value) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ReliefError::validation(format!("{} must be a whole number.", field))),
        None => Err(ReliefError::validation(format!("{} is required.", field))),
    }
}

/// Parse an optional `YYYY-MM-DD` field, defaulting to `today`. Years outside
/// the registry's accepted window are rejected like malformed dates.
pub fn date_or(value: &Option<String>, today: NaiveDate) -> Result<NaiveDate> {
    match non_empty(value) {
        Some(raw) => parse_date(&raw)
            .ok_or_else(|| ReliefError::validation("Invalid date format (YYYY-MM-DD).")),
        None => Ok(today),
    }
}
