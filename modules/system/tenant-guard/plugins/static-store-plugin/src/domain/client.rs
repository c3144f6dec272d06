//! Client implementation for the static tenant store.
//!
//! Implements `TenantStore` using the domain service.

use async_trait::async_trait;
use tenant_guard_sdk::{OwnershipCheck, SessionBinding, StoreError, TenantBinding, TenantStore};
use zt_security::{KeyHash, SessionToken, TenantKey};

use super::service::Service;

#[async_trait]
impl TenantStore for Service {
    async fn lookup_tenant_by_key_hash(
        &self,
        hash: &KeyHash,
    ) -> Result<Option<TenantBinding>, StoreError> {
        Ok(self.tenant_by_hash(hash))
    }

    async fn lookup_user_by_session_and_tenant(
        &self,
        token: &SessionToken,
        tenant: &TenantKey,
    ) -> Result<Option<SessionBinding>, StoreError> {
        Ok(self.session(token, *tenant))
    }

    async fn check_ownership(
        &self,
        check: OwnershipCheck,
        value: &str,
        tenant: &TenantKey,
    ) -> Result<bool, StoreError> {
        Ok(self.owns(check, value, *tenant))
    }
}
