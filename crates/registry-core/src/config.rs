//! Registry configuration (programmatic or from environment).

use registry_types::{ConfigError, ResetScope};

/// Construction-time settings. `admin_id` is fixed for the registry's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub admin_id: String,
    /// Maximum number of distinct registrants counted by `total_count`.
    pub max_registrants: Option<u64>,
    pub reset_scope: ResetScope,
}

impl RegistryConfig {
    pub fn new(admin_id: impl Into<String>) -> Self {
        Self {
            admin_id: admin_id.into(),
            max_registrants: None,
            reset_scope: ResetScope::default(),
        }
    }

    pub fn with_max_registrants(mut self, cap: u64) -> Self {
        self.max_registrants = Some(cap);
        self
    }

    pub fn with_reset_scope(mut self, scope: ResetScope) -> Self {
        self.reset_scope = scope;
        self
    }

    /// Reads `REGISTRY_ADMIN_ID` (required), `REGISTRY_MAX_REGISTRANTS` and
    /// `REGISTRY_RESET_SCOPE` (`counters` | `full`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let admin_id = get("REGISTRY_ADMIN_ID")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("REGISTRY_ADMIN_ID"))?;
        let mut cfg = Self::new(admin_id.trim());
        if let Some(raw) = get("REGISTRY_MAX_REGISTRANTS") {
            let cap = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "REGISTRY_MAX_REGISTRANTS",
                reason: e.to_string(),
            })?;
            cfg = cfg.with_max_registrants(cap);
        }
        if let Some(raw) = get("REGISTRY_RESET_SCOPE") {
            let scope = raw
                .parse::<ResetScope>()
                .map_err(|reason| ConfigError::Invalid {
                    name: "REGISTRY_RESET_SCOPE",
                    reason,
                })?;
            cfg = cfg.with_reset_scope(scope);
        }
        Ok(cfg)
    }
}
