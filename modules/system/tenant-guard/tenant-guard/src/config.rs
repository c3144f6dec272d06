use std::time::Duration;

use http::HeaderName;
use serde::{Deserialize, Serialize};
use tenant_guard_sdk::ResourceKind;
use thiserror::Error;

fn default_body_limit_bytes() -> usize {
    16 * 1024 * 1024
}

/// Errors found while validating a [`TenantGuardConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid session header name '{0}'")]
    InvalidSessionHeader(String),

    #[error("resource kind '{0}' has no ownership check and cannot be a known kind")]
    UncheckableKind(ResourceKind),
}

/// Tenant guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenantGuardConfig {
    /// TTL for cached ownership results of every kind except `session`.
    pub ownership_ttl_secs: u64,
    /// TTL for cached session ownership results and resolved users.
    pub session_ttl_secs: u64,
    /// TTL for resolved tenants. Clamped to the binding's own expiry.
    pub tenant_ttl_secs: u64,
    /// Entry count that triggers eviction of the oldest 10%.
    pub cache_max_entries: usize,
    /// Period of the background sweep of expired cache entries.
    pub cache_sweep_interval_secs: u64,
    /// Bound on every store and audit-sink call.
    pub store_timeout_ms: u64,
    /// Dedicated session-token header.
    pub session_header: String,
    /// Cookie consulted when the session header is absent.
    pub session_cookie: String,
    /// Paths starting with one of these bypass the guard.
    pub bypass_prefixes: Vec<String>,
    /// Paths equal to one of these bypass the guard.
    pub bypass_exact: Vec<String>,
    /// Body fields that are never treated as identifiers.
    pub non_identifier_fields: Vec<String>,
    /// Kinds proven against the store. Anything else is allowed and flagged.
    pub known_kinds: Vec<ResourceKind>,
    /// Largest request body buffered for identifier extraction.
    pub max_body_bytes: usize,
    /// Recursion cap for the body walk.
    pub max_body_depth: usize,
}

impl Default for TenantGuardConfig {
    fn default() -> Self {
        Self {
            ownership_ttl_secs: 300,
            session_ttl_secs: 60,
            tenant_ttl_secs: 300,
            cache_max_entries: 1000,
            cache_sweep_interval_secs: 60,
            store_timeout_ms: 2000,
            session_header: "x-session-token".to_owned(),
            session_cookie: "session_token".to_owned(),
            bypass_prefixes: vec![
                "/health".to_owned(),
                "/docs".to_owned(),
                "/openapi.json".to_owned(),
                "/redoc".to_owned(),
            ],
            bypass_exact: vec!["/".to_owned()],
            non_identifier_fields: vec![
                "page_url".to_owned(),
                "user_agent".to_owned(),
                "ip_address".to_owned(),
                "timestamp".to_owned(),
            ],
            known_kinds: vec![
                ResourceKind::User,
                ResourceKind::Email,
                ResourceKind::Asset,
                ResourceKind::Transaction,
                ResourceKind::Session,
            ],
            max_body_bytes: default_body_limit_bytes(),
            max_body_depth: 32,
        }
    }
}

impl TenantGuardConfig {
    #[must_use]
    pub fn ownership_ttl(&self) -> Duration {
        Duration::from_secs(self.ownership_ttl_secs)
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    #[must_use]
    pub fn tenant_ttl(&self) -> Duration {
        Duration::from_secs(self.tenant_ttl_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs)
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Parsed session header name.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidSessionHeader`] if the configured value
    /// is not a valid HTTP header name.
    pub fn session_header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::from_bytes(self.session_header.trim().as_bytes())
            .map_err(|_| ConfigError::InvalidSessionHeader(self.session_header.clone()))
    }

    /// Check the configuration for values the guard cannot run with.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("ownership_ttl_secs", self.ownership_ttl_secs),
            ("session_ttl_secs", self.session_ttl_secs),
            ("tenant_ttl_secs", self.tenant_ttl_secs),
            ("cache_sweep_interval_secs", self.cache_sweep_interval_secs),
            ("store_timeout_ms", self.store_timeout_ms),
        ];
        if let Some((field, _)) = positive.into_iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero { field });
        }
        if self.cache_max_entries == 0 {
            return Err(ConfigError::Zero {
                field: "cache_max_entries",
            });
        }
        if self.max_body_depth == 0 {
            return Err(ConfigError::Zero {
                field: "max_body_depth",
            });
        }
        self.session_header_name()?;
        if let Some(kind) = self
            .known_kinds
            .iter()
            .find(|k| k.ownership_check().is_none())
        {
            return Err(ConfigError::UncheckableKind(*kind));
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = TenantGuardConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.ownership_ttl(), Duration::from_secs(300));
        assert_eq!(cfg.session_ttl(), Duration::from_secs(60));
        assert_eq!(cfg.cache_max_entries, 1000);
        assert!(!cfg.known_kinds.contains(&ResourceKind::Agent));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let cfg = TenantGuardConfig {
            session_ttl_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Zero {
                field: "session_ttl_secs"
            })
        );
    }

    #[test]
    fn zero_cache_cap_is_rejected() {
        let cfg = TenantGuardConfig {
            cache_max_entries: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Zero { .. })));
    }

    #[test]
    fn bad_header_name_is_rejected() {
        let cfg = TenantGuardConfig {
            session_header: "bad header".to_owned(),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidSessionHeader(_))
        ));
    }

    #[test]
    fn tenant_cannot_be_a_known_kind() {
        let cfg = TenantGuardConfig {
            known_kinds: vec![ResourceKind::Asset, ResourceKind::Tenant],
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::UncheckableKind(ResourceKind::Tenant))
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: TenantGuardConfig =
            serde_json::from_str(r#"{"known_kinds":["asset","agent"],"store_timeout_ms":50}"#)
                .unwrap();
        assert_eq!(cfg.known_kinds, vec![ResourceKind::Asset, ResourceKind::Agent]);
        assert_eq!(cfg.store_timeout(), Duration::from_millis(50));
        assert_eq!(cfg.session_header, "x-session-token");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<TenantGuardConfig>(r#"{"ttl":5}"#);
        assert!(result.is_err());
    }
}
