//! Error types for the core store.

use thiserror::Error;
use triagem_rs_gateway::GatewayError;
use triagem_rs_protocol::{AttendanceType, PatientId, PriorityLevel};
use triagem_rs_storage::StorageError;

/// Errors returned by user-initiated store operations.
#[derive(Debug, Error)]
pub enum TriageError {
    /// Backend request failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    /// Durable storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// Recent calls could not be encoded for storage.
    #[error("failed to encode recent calls: {0}")]
    Encode(#[from] serde_json::Error),
    /// Patient id is not in the cache.
    #[error("unknown patient: {0}")]
    UnknownPatient(PatientId),
    /// Priority is not allowed for the attendance type.
    #[error("priority {priority} is not allowed for {attendance} attendance")]
    InvalidClassification {
        priority: PriorityLevel,
        attendance: AttendanceType,
    },
    /// A required field is missing or blank.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Room number failed validation.
    #[error("invalid room: {0}")]
    InvalidRoom(String),
    /// Room number is already registered.
    #[error("room {0} already exists")]
    RoomExists(u8),
}
