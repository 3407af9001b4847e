use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tokio_postgres::error::SqlState;

#[derive(Debug, Error)]
pub enum ReliefError {
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Disaster not found: {disaster_id}")]
    DisasterNotFound { disaster_id: i32 },

    #[error("Relief item {item_id} not found in disaster {disaster_id}")]
    ItemNotFound { disaster_id: i32, item_id: i32 },

    #[error("Insufficient inventory for item {item_id}: requested {requested}, available {available}")]
    InsufficientInventory {
        item_id: i32,
        available: i32,
        requested: i32,
    },

    #[error("Resource locked: {resource} - {cause}")]
    ResourceLocked { resource: String, cause: String },

    #[error("Storage operation failed: {operation} - {cause}")]
    Storage { operation: String, cause: String },

    #[error("Connection failed: {cause}")]
    ConnectionFailed { cause: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReliefError {
    pub fn validation(message: impl Into<String>) -> Self {
        ReliefError::Validation {
            message: message.into(),
        }
    }

    /// Classify a driver error raised while performing `operation`.
    ///
    /// Lock waits that ran out (`55P03 lock_not_available`) become
    /// [`ReliefError::ResourceLocked`]; every other failure is a storage error.
    pub fn storage(operation: impl Into<String>, err: tokio_postgres::Error) -> Self {
        let operation = operation.into();
        if is_lock_conflict(err.code()) {
            ReliefError::ResourceLocked {
                resource: operation,
                cause: err.to_string(),
            }
        } else {
            ReliefError::Storage {
                operation,
                cause: err.to_string(),
            }
        }
    }
}

pub fn is_lock_conflict(code: Option<&SqlState>) -> bool {
    matches!(code, Some(code) if *code == SqlState::LOCK_NOT_AVAILABLE)
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disaster_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl IntoResponse for ReliefError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ReliefError::Validation { message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "validation_error".to_string(),
                    message: message.clone(),
                    disaster_id: None,
                    cause: None,
                },
            ),
            ReliefError::DisasterNotFound { disaster_id } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "disaster_not_found".to_string(),
                    message: format!("Disaster {} does not exist", disaster_id),
                    disaster_id: Some(*disaster_id),
                    cause: None,
                },
            ),
            ReliefError::ItemNotFound {
                disaster_id,
                item_id,
            } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "item_not_found".to_string(),
                    message: format!("Relief item {} does not exist", item_id),
                    disaster_id: Some(*disaster_id),
                    cause: None,
                },
            ),
            ReliefError::InsufficientInventory { .. } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "insufficient_inventory".to_string(),
                    message: "Not enough inventory for the selected item.".to_string(),
                    disaster_id: None,
                    cause: Some(self.to_string()),
                },
            ),
            ReliefError::ResourceLocked { resource, cause } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: "resource_locked".to_string(),
                    message: format!("'{}' is locked by another session, try again", resource),
                    disaster_id: None,
                    cause: Some(cause.clone()),
                },
            ),
            ReliefError::Storage { operation, cause } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "storage_error".to_string(),
                    message: format!("Storage operation '{}' failed", operation),
                    disaster_id: None,
                    cause: Some(cause.clone()),
                },
            ),
            ReliefError::ConnectionFailed { cause } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: "connection_failed".to_string(),
                    message: "Failed to connect to the database".to_string(),
                    disaster_id: None,
                    cause: Some(cause.clone()),
                },
            ),
            ReliefError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "internal_error".to_string(),
                    message: msg.clone(),
                    disaster_id: None,
                    cause: None,
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<deadpool_postgres::PoolError> for ReliefError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        ReliefError::ConnectionFailed {
            cause: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReliefError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_conflict_classification() {
        assert!(is_lock_conflict(Some(&SqlState::LOCK_NOT_AVAILABLE)));

        assert!(!is_lock_conflict(None));
        assert!(!is_lock_conflict(Some(&SqlState::UNIQUE_VIOLATION)));
        assert!(!is_lock_conflict(Some(&SqlState::CHECK_VIOLATION)));
        assert!(!is_lock_conflict(Some(&SqlState::T_R_DEADLOCK_DETECTED)));
    }

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (ReliefError::validation("Name is required."), StatusCode::BAD_REQUEST),
            (ReliefError::DisasterNotFound { disaster_id: 7 }, StatusCode::NOT_FOUND),
            (
                ReliefError::ItemNotFound {
                    disaster_id: 7,
                    item_id: 3,
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ReliefError::InsufficientInventory {
                    item_id: 3,
                    available: 450,
                    requested: 1000,
                },
                StatusCode::CONFLICT,
            ),
            (
                ReliefError::Storage {
                    operation: "create tables".to_string(),
                    cause: "boom".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_insufficient_inventory_message() {
        let err = ReliefError::InsufficientInventory {
            item_id: 3,
            available: 450,
            requested: 1000,
        };
        let msg = err.to_string();
        assert!(msg.contains("requested 1000"));
        assert!(msg.contains("available 450"));
    }
}
