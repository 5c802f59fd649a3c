//! Traits for audit sinks and clocks, and the registry error kinds.

use crate::AuditEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable mirror of the audit log.
///
/// The registry writes to the sink before it commits a mutation, so an
/// append error aborts the operation with no state change.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one entry.
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditSinkError>;

    /// All entries in append order.
    async fn list(&self) -> Result<Vec<AuditEntry>, AuditSinkError>;
}

/// Source of timestamps for records and audit entries.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditSinkError {
    #[error("audit sink io: {0}")]
    Io(#[from] std::io::Error),
    #[error("audit sink serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("audit sink error: {0}")]
    Other(String),
}

/// Errors surfaced by registry operations. None of them leave partial state.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry is closed")]
    RegistryClosed,
    #[error("registry is full (cap {cap})")]
    RegistryFull { cap: u64 },
    #[error("caller {caller_id} is not authorized")]
    NotAuthorized { caller_id: String },
    #[error("record not found: {owner_id}")]
    RecordNotFound { owner_id: String },
    #[error("audit: {0}")]
    Audit(#[from] AuditSinkError),
}

impl RegistryError {
    /// Application code used by adapters for the response envelope.
    pub fn code(&self) -> i32 {
        match self {
            RegistryError::RegistryClosed => 409,
            RegistryError::RegistryFull { .. } => 429,
            RegistryError::NotAuthorized { .. } => 403,
            RegistryError::RecordNotFound { .. } => 404,
            RegistryError::Audit(_) => 500,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
