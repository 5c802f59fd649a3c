//! Audit and notification types: AuditEntry, AuditKind, RegistryEvent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of accepted state-changing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Register,
    UpdateRecord,
    Deactivate,
    Close,
    Reopen,
    Reset,
}

/// One audit log entry. `seq` is gapless and follows the order in which
/// mutations were serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub kind: AuditKind,
    pub caller_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

/// Notification pushed to subscribers after an accepted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    Registered {
        owner_id: String,
        display_name: String,
    },
}

/// Options for listing audit entries (filter + pagination).
#[derive(Debug, Clone, Default)]
pub struct AuditListOptions {
    pub caller_id: Option<String>,
    /// Return entries with `at >= since`.
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Filter, reverse to newest-first, then paginate (default limit 100).
pub fn apply_audit_list_opts(out: &mut Vec<AuditEntry>, opts: &AuditListOptions) {
    if let Some(ref cid) = opts.caller_id {
        out.retain(|e| &e.caller_id == cid);
    }
    if let Some(since) = opts.since {
        out.retain(|e| e.at >= since);
    }
    out.reverse();
    let offset = opts.offset.unwrap_or(0) as usize;
    let limit = opts.limit.unwrap_or(100) as usize;
    let taken: Vec<AuditEntry> = std::mem::take(out)
        .into_iter()
        .skip(offset)
        .take(limit)
        .collect();
    *out = taken;
}
