//! Record and registry status snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One registrant's data, keyed by `owner_id`.
///
/// Values of this type handed out by the registry are owned snapshots;
/// changing them never touches stored state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub owner_id: String,
    pub display_name: String,
    pub numeric_attribute: u64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// Fresh active record, as written by a registration.
    pub fn new(
        owner_id: impl Into<String>,
        display_name: impl Into<String>,
        numeric_attribute: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            display_name: display_name.into(),
            numeric_attribute,
            active: true,
            created_at,
        }
    }
}

/// What `admin_reset` wipes besides the open flag and the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    /// Keep `records`; only `is_open` and `total_count` are reset.
    #[default]
    CountersOnly,
    /// Also clear `records`.
    Full,
}

impl ResetScope {
    pub fn as_str(self) -> &'static str {
        match self {
            ResetScope::CountersOnly => "counters",
            ResetScope::Full => "full",
        }
    }
}

impl std::fmt::Display for ResetScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResetScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "counters" | "counters_only" => Ok(ResetScope::CountersOnly),
            "full" => Ok(ResetScope::Full),
            other => Err(format!("unknown reset scope: {other}")),
        }
    }
}

/// Point-in-time view of registry-wide fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStatus {
    pub admin_id: String,
    pub is_open: bool,
    pub total_count: u64,
    pub record_count: usize,
    pub audit_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_registrants: Option<u64>,
    pub reset_scope: ResetScope,
}
