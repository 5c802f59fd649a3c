//! The registry: records keyed by principal id, a fixed admin, an open/closed
//! flag, a registrant counter and an append-only audit log.
//!
//! All state sits behind a single lock so every mutation is atomic with
//! respect to the whole registry. Guards run first, then the audit entry is
//! written to the sink, and only then is in-memory state touched; a failure at
//! any step leaves the registry unchanged.

use crate::audit::NoopAuditSink;
use crate::clock::SystemClock;
use crate::config::RegistryConfig;
use chrono::{DateTime, Utc};
use registry_types::{
    AuditEntry, AuditKind, AuditSink, Clock, Record, RegistryError, RegistryEvent, RegistryStatus,
    ResetScope,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug)]
struct RegistryState {
    records: HashMap<String, Record>,
    is_open: bool,
    audit_log: Vec<AuditEntry>,
    total_count: u64,
}

/// Permissioned record registry.
///
/// Share across tasks as `Arc<Registry>`. Reads return owned snapshots;
/// admin updates mutate the stored entry in place.
pub struct Registry {
    config: RegistryConfig,
    state: RwLock<RegistryState>,
    sink: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Registry {
    /// Open registry with no records, a no-op audit sink and the system clock.
    pub fn new(config: RegistryConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            state: RwLock::new(RegistryState {
                records: HashMap::new(),
                is_open: true,
                audit_log: Vec::new(),
                total_count: 0,
            }),
            sink: Arc::new(NoopAuditSink),
            clock: Arc::new(SystemClock),
            events,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the audit log from the sink so numbering continues after a
    /// restart. Records are not rebuilt; only the audit history is durable.
    pub async fn restore_audit(self) -> Result<Self, RegistryError> {
        let stored = self.sink.list().await?;
        let restored = stored.len();
        {
            let mut state = self.state.write().await;
            state.audit_log = stored;
        }
        if restored > 0 {
            tracing::info!(restored, "audit log restored from sink");
        }
        Ok(self)
    }

    pub fn admin_id(&self) -> &str {
        &self.config.admin_id
    }

    /// Receive `Registered` notifications. Delivery order across subscribers
    /// is not guaranteed; a lagging receiver drops the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    fn ensure_admin(&self, caller_id: &str, op: &'static str) -> Result<(), RegistryError> {
        if caller_id != self.config.admin_id {
            tracing::warn!(caller_id = %caller_id, op, "rejected non-admin call");
            return Err(RegistryError::NotAuthorized {
                caller_id: caller_id.to_string(),
            });
        }
        Ok(())
    }

    /// Write to the sink, then append to the in-memory log. Must be the last
    /// fallible step of a mutation.
    async fn append_audit(
        &self,
        state: &mut RegistryState,
        kind: AuditKind,
        caller_id: &str,
        target_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let entry = AuditEntry {
            seq: state.audit_log.last().map_or(0, |e| e.seq + 1),
            at,
            kind,
            caller_id: caller_id.to_string(),
            target_id: target_id.map(String::from),
        };
        self.sink.append(&entry).await?;
        state.audit_log.push(entry);
        Ok(())
    }

    /// Insert or wholesale overwrite the caller's own record.
    ///
    /// `total_count` only grows for an id that was not present. The cap is
    /// checked against `total_count` and never blocks an overwrite.
    pub async fn register(
        &self,
        caller_id: &str,
        name: &str,
        numeric_attribute: u64,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write().await;
        if !state.is_open {
            return Err(RegistryError::RegistryClosed);
        }
        let is_new = !state.records.contains_key(caller_id);
        if is_new {
            if let Some(cap) = self.config.max_registrants {
                if state.total_count >= cap {
                    return Err(RegistryError::RegistryFull { cap });
                }
            }
        }

        let now = self.clock.now();
        self.append_audit(
            &mut state,
            AuditKind::Register,
            caller_id,
            Some(caller_id),
            now,
        )
        .await?;
        state.records.insert(
            caller_id.to_string(),
            Record::new(caller_id, name, numeric_attribute, now),
        );
        if is_new {
            state.total_count += 1;
        }
        tracing::debug!(
            caller_id = %caller_id,
            is_new,
            total_count = state.total_count,
            "registered"
        );

        // No subscribers is fine.
        let _ = self.events.send(RegistryEvent::Registered {
            owner_id: caller_id.to_string(),
            display_name: name.to_string(),
        });
        Ok(())
    }

    /// Admin-only. Sets `numeric_attribute` on the stored record in place.
    pub async fn update_record(
        &self,
        caller_id: &str,
        target_id: &str,
        new_attribute: u64,
    ) -> Result<(), RegistryError> {
        self.ensure_admin(caller_id, "update_record")?;
        let mut state = self.state.write().await;
        if !state.records.contains_key(target_id) {
            return Err(RegistryError::RecordNotFound {
                owner_id: target_id.to_string(),
            });
        }
        let now = self.clock.now();
        self.append_audit(
            &mut state,
            AuditKind::UpdateRecord,
            caller_id,
            Some(target_id),
            now,
        )
        .await?;
        if let Some(record) = state.records.get_mut(target_id) {
            record.numeric_attribute = new_attribute;
        }
        tracing::debug!(target_id = %target_id, new_attribute, "record updated");
        Ok(())
    }

    /// Admin-only. Clears the `active` flag; the record stays in the map.
    pub async fn deactivate(&self, caller_id: &str, target_id: &str) -> Result<(), RegistryError> {
        self.ensure_admin(caller_id, "deactivate")?;
        let mut state = self.state.write().await;
        if !state.records.contains_key(target_id) {
            return Err(RegistryError::RecordNotFound {
                owner_id: target_id.to_string(),
            });
        }
        let now = self.clock.now();
        self.append_audit(
            &mut state,
            AuditKind::Deactivate,
            caller_id,
            Some(target_id),
            now,
        )
        .await?;
        if let Some(record) = state.records.get_mut(target_id) {
            record.active = false;
        }
        tracing::debug!(target_id = %target_id, "record deactivated");
        Ok(())
    }

    /// Admin-only. Stops accepting registrations.
    pub async fn close(&self, caller_id: &str) -> Result<(), RegistryError> {
        self.ensure_admin(caller_id, "close")?;
        let mut state = self.state.write().await;
        let now = self.clock.now();
        self.append_audit(&mut state, AuditKind::Close, caller_id, None, now).await?;
        state.is_open = false;
        tracing::info!("registry closed");
        Ok(())
    }

    /// Admin-only. The only way back from `Closed` to `Open`.
    pub async fn reopen(&self, caller_id: &str) -> Result<(), RegistryError> {
        self.ensure_admin(caller_id, "reopen")?;
        let mut state = self.state.write().await;
        let now = self.clock.now();
        self.append_audit(&mut state, AuditKind::Reopen, caller_id, None, now).await?;
        state.is_open = true;
        tracing::info!("registry reopened");
        Ok(())
    }

    /// Admin-only. Closes the registry and zeroes `total_count`. Records are
    /// kept unless the configured scope is [`ResetScope::Full`]. The audit log
    /// is never cleared.
    pub async fn admin_reset(&self, caller_id: &str) -> Result<(), RegistryError> {
        self.ensure_admin(caller_id, "admin_reset")?;
        let mut state = self.state.write().await;
        let now = self.clock.now();
        self.append_audit(&mut state, AuditKind::Reset, caller_id, None, now).await?;
        state.is_open = false;
        state.total_count = 0;
        if self.config.reset_scope == ResetScope::Full {
            state.records.clear();
        }
        tracing::info!(scope = %self.config.reset_scope, "registry reset");
        Ok(())
    }

    /// Owned snapshot of one record.
    pub async fn get_record(&self, target_id: &str) -> Result<Record, RegistryError> {
        let state = self.state.read().await;
        state
            .records
            .get(target_id)
            .cloned()
            .ok_or_else(|| RegistryError::RecordNotFound {
                owner_id: target_id.to_string(),
            })
    }

    /// All records, sorted by `owner_id`.
    pub async fn list_records(&self) -> Vec<Record> {
        let state = self.state.read().await;
        let mut out: Vec<Record> = state.records.values().cloned().collect();
        out.sort_by(|a, b| a.owner_id.cmp(&b.owner_id));
        out
    }

    /// Integer mean of `numeric_attribute` over active records; 0 when none.
    pub async fn aggregate_attribute(&self) -> u64 {
        let state = self.state.read().await;
        let (sum, count) = state
            .records
            .values()
            .filter(|r| r.active)
            .fold((0u128, 0u128), |(sum, count), r| {
                (sum + u128::from(r.numeric_attribute), count + 1)
            });
        if count == 0 {
            return 0;
        }
        // Mean of u64 values fits in u64.
        (sum / count) as u64
    }

    pub async fn is_open(&self) -> bool {
        self.state.read().await.is_open
    }

    pub async fn total_count(&self) -> u64 {
        self.state.read().await.total_count
    }

    pub async fn status(&self) -> RegistryStatus {
        let state = self.state.read().await;
        RegistryStatus {
            admin_id: self.config.admin_id.clone(),
            is_open: state.is_open,
            total_count: state.total_count,
            record_count: state.records.len(),
            audit_len: state.audit_log.len(),
            max_registrants: self.config.max_registrants,
            reset_scope: self.config.reset_scope,
        }
    }

    /// Audit entries in serialization order.
    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.state.read().await.audit_log.clone()
    }

    pub async fn audit_timestamps(&self) -> Vec<DateTime<Utc>> {
        self.state
            .read()
            .await
            .audit_log
            .iter()
            .map(|e| e.at)
            .collect()
    }
}
