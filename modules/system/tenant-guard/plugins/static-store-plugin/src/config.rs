//! Configuration for the static tenant store.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tenant_guard_sdk::{OwnershipCheck, SessionStatus};
use zt_security::TenantKey;

fn default_active() -> bool {
    true
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

fn redacted<S: Serializer>(_: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str("[REDACTED]")
}

/// Store contents.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticStoreConfig {
    pub tenants: Vec<TenantEntry>,
    pub sessions: Vec<SessionEntry>,
    pub resources: Vec<ResourceEntry>,
}

/// A tenant and the API key bound to it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenantEntry {
    /// Unique tenant name. Other sections refer to tenants by this name.
    pub name: String,
    /// Raw API key. Hashed at load time; never serialized back out.
    #[serde(deserialize_with = "secret", serialize_with = "redacted")]
    pub api_key: SecretString,
    /// Explicit tenant key. Defaults to the SHA-256 of `name`.
    #[serde(default)]
    pub tenant_key: Option<TenantKey>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A session issued to a user of one tenant.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionEntry {
    pub token: String,
    /// Name of the issuing tenant.
    pub tenant: String,
    /// Business key of the user.
    pub user_bk: String,
    #[serde(default)]
    pub user_label: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A business key owned by a tenant.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceEntry {
    pub kind: OwnershipCheck,
    pub value: String,
    /// Name of the owning tenant.
    pub tenant: String,
}
