//! Traits implemented by the guard's external collaborators.

use async_trait::async_trait;
use zt_security::{KeyHash, SessionToken, TenantKey};

use crate::error::{AuditSinkError, StoreError};
use crate::models::{AuditRecord, OwnershipCheck, SessionBinding, TenantBinding};

/// Read-only view of the persistent tenant store.
///
/// Implementations must scope every query to the supplied tenant key; the
/// guard relies on that to keep tenants isolated.
///
/// ```ignore
/// let binding = store.lookup_tenant_by_key_hash(&api_key.hash()).await?;
/// ```
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Find the tenant bound to an API-key hash.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the store cannot answer.
    async fn lookup_tenant_by_key_hash(
        &self,
        hash: &KeyHash,
    ) -> Result<Option<TenantBinding>, StoreError>;

    /// Find the session `token` issued under `tenant`.
    ///
    /// Must return `Ok(None)` for sessions that exist under a different tenant.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the store cannot answer.
    async fn lookup_user_by_session_and_tenant(
        &self,
        token: &SessionToken,
        tenant: &TenantKey,
    ) -> Result<Option<SessionBinding>, StoreError>;

    /// Does the business key `value` of the given kind belong to `tenant`?
    ///
    /// # Errors
    /// Returns [`StoreError`] if the store cannot answer.
    async fn check_ownership(
        &self,
        check: OwnershipCheck,
        value: &str,
        tenant: &TenantKey,
    ) -> Result<bool, StoreError>;
}

/// Append-only audit destination.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one audit record.
    ///
    /// # Errors
    /// Returns [`AuditSinkError`] if the record could not be written.
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditSinkError>;
}
