//! Service implementation for the static tenant store.

use std::collections::{HashMap, HashSet};

use secrecy::ExposeSecret;
use tenant_guard_sdk::{OwnershipCheck, SessionBinding, TenantBinding};
use zt_security::{ApiKey, KeyHash, SessionToken, TenantKey, UserKey};

use super::StaticStoreError;
use crate::config::StaticStoreConfig;

/// Static tenant store.
///
/// API keys are hashed once at load time; the raw keys are not retained.
/// Every index is keyed by tenant so no lookup can cross tenants.
#[derive(Debug, Default)]
pub struct Service {
    tenants_by_name: HashMap<String, TenantKey>,
    tenants_by_hash: HashMap<KeyHash, TenantBinding>,
    sessions: HashMap<(String, TenantKey), SessionBinding>,
    users: HashSet<(String, TenantKey)>,
    resources: HashSet<(OwnershipCheck, String, TenantKey)>,
}

impl Service {
    /// Build the store from configuration.
    ///
    /// # Errors
    /// Returns [`StaticStoreError`] for duplicate tenants or keys, empty API
    /// keys, and references to tenants that are not declared.
    pub fn from_config(cfg: &StaticStoreConfig) -> Result<Self, StaticStoreError> {
        let mut svc = Self::default();

        for entry in &cfg.tenants {
            let raw = entry.api_key.expose_secret();
            if raw.trim().is_empty() {
                return Err(StaticStoreError::EmptyApiKey(entry.name.clone()));
            }
            let tenant_key = entry
                .tenant_key
                .unwrap_or_else(|| TenantKey::derive(entry.name.as_bytes()));
            if svc
                .tenants_by_name
                .insert(entry.name.clone(), tenant_key)
                .is_some()
            {
                return Err(StaticStoreError::DuplicateTenant(entry.name.clone()));
            }
            let hash = ApiKey::new(raw).hash();
            let binding = TenantBinding {
                tenant_key,
                tenant_name: entry.name.clone(),
                active: entry.active,
                expires_at: entry.expires_at,
            };
            if svc.tenants_by_hash.insert(hash, binding).is_some() {
                return Err(StaticStoreError::DuplicateApiKey(entry.name.clone()));
            }
        }

        for entry in &cfg.sessions {
            let tenant_key = svc.tenant_named("sessions", &entry.tenant)?;
            let user_key = UserKey::derive(format!("{tenant_key}:{}", entry.user_bk).as_bytes());
            let label = if entry.user_label.is_empty() {
                entry.user_bk.clone()
            } else {
                entry.user_label.clone()
            };
            svc.users.insert((entry.user_bk.clone(), tenant_key));
            svc.sessions.insert(
                (entry.token.clone(), tenant_key),
                SessionBinding {
                    user_key,
                    user_label: label,
                    status: entry.status,
                    expires_at: entry.expires_at,
                },
            );
        }

        for entry in &cfg.resources {
            let tenant_key = svc.tenant_named("resources", &entry.tenant)?;
            svc.resources
                .insert((entry.kind, entry.value.clone(), tenant_key));
        }

        tracing::info!(
            tenants = svc.tenants_by_hash.len(),
            sessions = svc.sessions.len(),
            resources = svc.resources.len(),
            "static tenant store loaded"
        );
        Ok(svc)
    }

    fn tenant_named(&self, section: &'static str, name: &str) -> Result<TenantKey, StaticStoreError> {
        self.tenants_by_name
            .get(name)
            .copied()
            .ok_or_else(|| StaticStoreError::UnknownTenant {
                section,
                tenant: name.to_owned(),
            })
    }

    /// Key of the tenant declared under `name`.
    #[must_use]
    pub fn tenant_key(&self, name: &str) -> Option<TenantKey> {
        self.tenants_by_name.get(name).copied()
    }

    #[must_use]
    pub fn tenant_by_hash(&self, hash: &KeyHash) -> Option<TenantBinding> {
        self.tenants_by_hash.get(hash).cloned()
    }

    #[must_use]
    pub fn session(&self, token: &SessionToken, tenant: TenantKey) -> Option<SessionBinding> {
        self.sessions
            .get(&(token.as_str().to_owned(), tenant))
            .cloned()
    }

    /// Does `value` belong to `tenant` under `check`?
    #[must_use]
    pub fn owns(&self, check: OwnershipCheck, value: &str, tenant: TenantKey) -> bool {
        let scoped = (value.to_owned(), tenant);
        match check {
            OwnershipCheck::Session => self.sessions.contains_key(&scoped),
            OwnershipCheck::User => {
                self.users.contains(&scoped) || self.has_resource(check, scoped)
            }
            OwnershipCheck::Email
            | OwnershipCheck::Asset
            | OwnershipCheck::Transaction
            | OwnershipCheck::Agent => self.has_resource(check, scoped),
        }
    }

    fn has_resource(&self, check: OwnershipCheck, (value, tenant): (String, TenantKey)) -> bool {
        self.resources.contains(&(check, value, tenant))
    }
}
