//! Registry component, audit sinks, clocks and configuration.

mod audit;
mod clock;
mod config;
mod registry;

pub use audit::{InMemoryAuditSink, JsonlAuditSink, NoopAuditSink};
pub use clock::{ManualClock, SystemClock};
pub use config::RegistryConfig;
pub use registry::Registry;
pub use registry_types::{
    AuditEntry, AuditKind, AuditSink, AuditSinkError, Clock, ConfigError, Record, RegistryError,
    RegistryEvent, RegistryStatus, ResetScope,
};
