//! Request and response DTOs for the registry HTTP adapter.

use crate::{AuditEntry, Record, RegistryStatus};
use serde::{Deserialize, Serialize};

/// Register (or overwrite) the caller's own record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default)]
    pub numeric_attribute: u64,
}

/// Admin update of a target's numeric attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecordRequest {
    pub target_id: String,
    pub numeric_attribute: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeactivateRequest {
    pub target_id: String,
}

/// Base response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    #[serde(default = "default_code")]
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
}

fn default_code() -> i32 {
    200
}

impl<T> BaseResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "Success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Aggregate result (integer mean over active records).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AggregateData {
    pub aggregate: u64,
}

pub type AckResponse = BaseResponse<()>;
pub type RecordResponse = BaseResponse<Record>;
pub type RecordListResponse = BaseResponse<Vec<Record>>;
pub type AggregateResponse = BaseResponse<AggregateData>;
pub type StatusResponse = BaseResponse<RegistryStatus>;
pub type AuditListResponse = BaseResponse<Vec<AuditEntry>>;
