use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::identity::{TenantIdentity, UserIdentity};
use crate::keys::{TenantKey, UserKey};

/// Errors raised when assembling a [`GuardContext`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("a guard context requires a resolved tenant")]
    MissingTenant,

    #[error("user session belongs to a different tenant than the resolved tenant")]
    TenantMismatch,
}

/// `GuardContext` is the identity attached to a request once the tenant
/// guard has allowed it.
///
/// Built by the guard after every check passed and inserted into the request
/// extensions for downstream handlers. It holds exactly one tenant and at most
/// one user, and the user is always subordinate to that tenant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GuardContext {
    tenant: TenantIdentity,
    user: Option<UserIdentity>,
    validated_at: DateTime<Utc>,
}

impl GuardContext {
    /// Create a new `GuardContext` builder
    #[must_use]
    pub fn builder() -> GuardContextBuilder {
        GuardContextBuilder::default()
    }

    #[must_use]
    pub fn tenant(&self) -> &TenantIdentity {
        &self.tenant
    }

    /// Shortcut for `tenant().tenant_key()`.
    #[must_use]
    pub fn tenant_key(&self) -> TenantKey {
        self.tenant.tenant_key()
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn user_key(&self) -> Option<UserKey> {
        self.user.as_ref().map(UserIdentity::user_key)
    }

    /// When the guard finished validating the request.
    #[must_use]
    pub fn validated_at(&self) -> DateTime<Utc> {
        self.validated_at
    }
}

#[derive(Default)]
pub struct GuardContextBuilder {
    tenant: Option<TenantIdentity>,
    user: Option<UserIdentity>,
    validated_at: Option<DateTime<Utc>>,
}

impl GuardContextBuilder {
    #[must_use]
    pub fn tenant(mut self, tenant: TenantIdentity) -> Self {
        self.tenant = Some(tenant);
        self
    }

    #[must_use]
    pub fn user(mut self, user: Option<UserIdentity>) -> Self {
        self.user = user;
        self
    }

    #[must_use]
    pub fn validated_at(mut self, at: DateTime<Utc>) -> Self {
        self.validated_at = Some(at);
        self
    }

    /// Finish the context.
    ///
    /// # Errors
    /// - [`ContextError::MissingTenant`] if no tenant was supplied
    /// - [`ContextError::TenantMismatch`] if the user was issued under another tenant
    pub fn build(self) -> Result<GuardContext, ContextError> {
        let tenant = self.tenant.ok_or(ContextError::MissingTenant)?;
        if let Some(user) = &self.user
            && user.tenant_key() != tenant.tenant_key()
        {
            return Err(ContextError::TenantMismatch);
        }
        Ok(GuardContext {
            tenant,
            user: self.user,
            validated_at: self.validated_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn tenant(name: &str) -> TenantIdentity {
        TenantIdentity::new(TenantKey::derive(name.as_bytes()), name)
    }

    fn user_of(label: &str, tenant: &TenantIdentity) -> UserIdentity {
        UserIdentity::new(
            UserKey::derive(label.as_bytes()),
            label,
            tenant.tenant_key(),
        )
    }

    #[test]
    fn test_guard_context_tenant_only() {
        let acme = tenant("acme");
        let ctx = GuardContext::builder().tenant(acme.clone()).build().unwrap();

        assert_eq!(ctx.tenant(), &acme);
        assert_eq!(ctx.tenant_key(), acme.tenant_key());
        assert!(ctx.user().is_none());
        assert!(ctx.user_key().is_none());
    }

    #[test]
    fn test_guard_context_with_user() {
        let acme = tenant("acme");
        let alice = user_of("alice", &acme);
        let ctx = GuardContext::builder()
            .tenant(acme)
            .user(Some(alice.clone()))
            .build()
            .unwrap();

        assert_eq!(ctx.user(), Some(&alice));
        assert_eq!(ctx.user_key(), Some(alice.user_key()));
    }

    #[test]
    fn test_guard_context_requires_tenant() {
        let err = GuardContext::builder().build().unwrap_err();
        assert_eq!(err, ContextError::MissingTenant);
    }

    #[test]
    fn test_guard_context_rejects_foreign_user() {
        let acme = tenant("acme");
        let globex = tenant("globex");
        let mallory = user_of("mallory", &globex);

        let err = GuardContext::builder()
            .tenant(acme)
            .user(Some(mallory))
            .build()
            .unwrap_err();
        assert_eq!(err, ContextError::TenantMismatch);
    }

    #[test]
    fn test_guard_context_keeps_validation_time() {
        let at = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let ctx = GuardContext::builder()
            .tenant(tenant("acme"))
            .validated_at(at)
            .build()
            .unwrap();
        assert_eq!(ctx.validated_at(), at);
    }

    #[test]
    fn test_guard_context_serialize_deserialize() {
        let acme = tenant("acme");
        let original = GuardContext::builder()
            .tenant(acme.clone())
            .user(Some(user_of("alice", &acme)))
            .build()
            .unwrap();

        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: GuardContext = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, original);
        assert!(serialized.contains(&acme.tenant_key().to_hex()));
    }
}
