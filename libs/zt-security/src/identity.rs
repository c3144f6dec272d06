use serde::{Deserialize, Serialize};

use crate::keys::{TenantKey, UserKey};

/// Tenant resolved from an API key. Immutable for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantIdentity {
    tenant_key: TenantKey,
    tenant_name: String,
}

impl TenantIdentity {
    #[must_use]
    pub fn new(tenant_key: TenantKey, tenant_name: impl Into<String>) -> Self {
        Self {
            tenant_key,
            tenant_name: tenant_name.into(),
        }
    }

    #[must_use]
    pub fn tenant_key(&self) -> TenantKey {
        self.tenant_key
    }

    #[must_use]
    pub fn tenant_name(&self) -> &str {
        &self.tenant_name
    }
}

/// User resolved from a session token.
///
/// Carries the key of the tenant the session was issued under so the
/// subordination to a [`TenantIdentity`] can be checked when both are
/// combined into a [`crate::GuardContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_key: UserKey,
    user_label: String,
    tenant_key: TenantKey,
}

impl UserIdentity {
    #[must_use]
    pub fn new(user_key: UserKey, user_label: impl Into<String>, tenant_key: TenantKey) -> Self {
        Self {
            user_key,
            user_label: user_label.into(),
            tenant_key,
        }
    }

    #[must_use]
    pub fn user_key(&self) -> UserKey {
        self.user_key
    }

    #[must_use]
    pub fn user_label(&self) -> &str {
        &self.user_label
    }

    /// Tenant under which the user's session was issued.
    #[must_use]
    pub fn tenant_key(&self) -> TenantKey {
        self.tenant_key
    }
}
