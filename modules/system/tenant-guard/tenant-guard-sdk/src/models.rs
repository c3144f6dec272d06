//! Domain models shared between the tenant guard and its collaborators.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zt_security::{TenantKey, UserKey};

/// Kind of a resource identifier found in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Asset,
    Transaction,
    Session,
    Agent,
    Tenant,
    Email,
    /// A raw `field:value` pair that did not match any identifier shape.
    Unclassified,
}

impl ResourceKind {
    /// Kinds recognised by their business-key prefix (`asset_123`).
    pub const PREFIXED: [Self; 6] = [
        Self::User,
        Self::Asset,
        Self::Transaction,
        Self::Session,
        Self::Agent,
        Self::Tenant,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Asset => "asset",
            Self::Transaction => "transaction",
            Self::Session => "session",
            Self::Agent => "agent",
            Self::Tenant => "tenant",
            Self::Email => "email",
            Self::Unclassified => "unclassified",
        }
    }

    /// The store check that proves ownership for this kind, if one exists.
    #[must_use]
    pub const fn ownership_check(self) -> Option<OwnershipCheck> {
        match self {
            Self::User => Some(OwnershipCheck::User),
            Self::Email => Some(OwnershipCheck::Email),
            Self::Asset => Some(OwnershipCheck::Asset),
            Self::Transaction => Some(OwnershipCheck::Transaction),
            Self::Session => Some(OwnershipCheck::Session),
            Self::Agent => Some(OwnershipCheck::Agent),
            Self::Tenant | Self::Unclassified => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "asset" => Ok(Self::Asset),
            "transaction" => Ok(Self::Transaction),
            "session" => Ok(Self::Session),
            "agent" => Ok(Self::Agent),
            "tenant" => Ok(Self::Tenant),
            "email" => Ok(Self::Email),
            "unclassified" => Ok(Self::Unclassified),
            other => Err(format!("unknown resource kind '{other}'")),
        }
    }
}

/// One identifier extracted from a request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceReference {
    pub kind: ResourceKind,
    pub value: String,
}

impl ResourceReference {
    #[must_use]
    pub fn new(kind: ResourceKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Generic `field:value` reference.
    #[must_use]
    pub fn unclassified(field: &str, value: &str) -> Self {
        Self::new(ResourceKind::Unclassified, format!("{field}:{value}"))
    }
}

/// Store-side ownership predicates, one per checkable kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipCheck {
    /// A user with this business key exists under the tenant.
    User,
    /// A user with this email exists under the tenant.
    Email,
    Asset,
    Transaction,
    /// The session token belongs to a user of the tenant.
    Session,
    Agent,
}

/// Tenant record bound to an API-key hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantBinding {
    pub tenant_key: TenantKey,
    pub tenant_name: String,
    pub active: bool,
    /// `None` means the binding never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    Revoked,
    Expired,
}

/// Session record for a `(token, tenant)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBinding {
    pub user_key: UserKey,
    pub user_label: String,
    pub status: SessionStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Validated,
    Violation,
}

/// Extra findings attached to an audit record for later review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditAnnotation {
    /// An identifier of a kind outside the ownership table was allowed
    /// without a store check.
    UnrecognizedKind { kind: ResourceKind, value: String },
}

/// Audit trail entry. Append-only; the guard never reads these back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub outcome: AuditOutcome,
    pub tenant_key: Option<TenantKey>,
    pub user_key: Option<UserKey>,
    pub method: String,
    pub path: String,
    pub client_addr: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Internal reason for a violation. Never shown to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Error class that triggered a violation (`unauthenticated`, `forbidden`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Request headers, captured for violations only. Credential-bearing
    /// headers hold a fingerprint instead of the raw value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AuditAnnotation>,
}
