//! Tenant and user resolution.
//!
//! Both lookups go cache first. Only successful resolutions are cached, and
//! never for longer than the binding itself stays valid.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tenant_guard_sdk::{SessionStatus, TenantStore};
use zt_security::{ApiKey, SessionToken, TenantIdentity, UserIdentity};

use super::deadline::{Bounded, within};
use super::error::ResolutionFailure;
use super::metrics::MetricsSink;
use crate::cache::{CachedValidation, ValidationCache, session_cache_key, tenant_cache_key};

/// How much longer a binding stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Validity {
    Unbounded,
    Remaining(Duration),
    Expired,
}

/// Expiry must be strictly after `now`.
fn validity(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Validity {
    match expires_at {
        None => Validity::Unbounded,
        Some(at) if at > now => at
            .signed_duration_since(now)
            .to_std()
            .map_or(Validity::Expired, Validity::Remaining),
        Some(_) => Validity::Expired,
    }
}

fn clamp_ttl(ttl: Duration, validity: Validity) -> Duration {
    match validity {
        Validity::Remaining(left) => ttl.min(left),
        Validity::Unbounded | Validity::Expired => ttl,
    }
}

pub struct TenantResolver {
    store: Arc<dyn TenantStore>,
    cache: Arc<ValidationCache<CachedValidation>>,
    metrics: Arc<dyn MetricsSink>,
    tenant_ttl: Duration,
    session_ttl: Duration,
    timeout: Duration,
}

impl TenantResolver {
    #[must_use]
    pub fn new(
        store: Arc<dyn TenantStore>,
        cache: Arc<ValidationCache<CachedValidation>>,
        metrics: Arc<dyn MetricsSink>,
        tenant_ttl: Duration,
        session_ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            metrics,
            tenant_ttl,
            session_ttl,
            timeout,
        }
    }

    /// Resolve the tenant bound to `api_key`.
    ///
    /// # Errors
    /// Returns the specific [`ResolutionFailure`]; store errors and timeouts
    /// are failures too.
    pub async fn resolve_tenant(&self, api_key: &ApiKey) -> Result<TenantIdentity, ResolutionFailure> {
        let hash = api_key.hash();
        let key = tenant_cache_key(&hash);
        if let Some(CachedValidation::Tenant(identity)) = self.cache.get(&key) {
            self.metrics.record_cache_lookup(true);
            return Ok(identity);
        }
        self.metrics.record_cache_lookup(false);

        let binding = match within(self.timeout, self.store.lookup_tenant_by_key_hash(&hash)).await {
            Bounded::Done(Some(binding)) => binding,
            Bounded::Done(None) => return Err(ResolutionFailure::KeyNotFound),
            Bounded::Failed(e) => {
                tracing::warn!(error = %e, "tenant lookup failed");
                return Err(ResolutionFailure::StoreFailure(e.to_string()));
            }
            Bounded::TimedOut => {
                tracing::warn!(timeout_ms = self.timeout.as_millis(), "tenant lookup timed out");
                return Err(ResolutionFailure::StoreTimeout);
            }
        };

        if !binding.active {
            return Err(ResolutionFailure::KeyDeactivated);
        }
        let validity = validity(binding.expires_at, Utc::now());
        if validity == Validity::Expired {
            return Err(ResolutionFailure::KeyExpired);
        }

        let identity = TenantIdentity::new(binding.tenant_key, binding.tenant_name);
        self.cache.put(
            key,
            CachedValidation::Tenant(identity.clone()),
            clamp_ttl(self.tenant_ttl, validity),
        );
        tracing::debug!(tenant_key = %identity.tenant_key(), "tenant resolved");
        Ok(identity)
    }

    /// Resolve the user behind `token`, scoped to `tenant`.
    ///
    /// A session issued under another tenant is reported exactly like a
    /// missing one.
    ///
    /// # Errors
    /// Returns the specific [`ResolutionFailure`].
    pub async fn resolve_user(
        &self,
        token: &SessionToken,
        tenant: &TenantIdentity,
    ) -> Result<UserIdentity, ResolutionFailure> {
        let tenant_key = tenant.tenant_key();
        let key = session_cache_key(token, tenant_key);
        if let Some(CachedValidation::User(user)) = self.cache.get(&key) {
            self.metrics.record_cache_lookup(true);
            return Ok(user);
        }
        self.metrics.record_cache_lookup(false);

        let lookup = self
            .store
            .lookup_user_by_session_and_tenant(token, &tenant_key);
        let binding = match within(self.timeout, lookup).await {
            Bounded::Done(Some(binding)) => binding,
            Bounded::Done(None) => return Err(ResolutionFailure::SessionNotFound),
            Bounded::Failed(e) => {
                tracing::warn!(error = %e, %tenant_key, "session lookup failed");
                return Err(ResolutionFailure::StoreFailure(e.to_string()));
            }
            Bounded::TimedOut => {
                tracing::warn!(%tenant_key, "session lookup timed out");
                return Err(ResolutionFailure::StoreTimeout);
            }
        };

        match binding.status {
            SessionStatus::Active => {}
            SessionStatus::Revoked => return Err(ResolutionFailure::SessionInactive),
            SessionStatus::Expired => return Err(ResolutionFailure::SessionExpired),
        }
        let validity = validity(binding.expires_at, Utc::now());
        if validity == Validity::Expired {
            return Err(ResolutionFailure::SessionExpired);
        }

        let user = UserIdentity::new(binding.user_key, binding.user_label, tenant_key);
        self.cache.put(
            key,
            CachedValidation::User(user.clone()),
            clamp_ttl(self.session_ttl, validity),
        );
        Ok(user)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn expiry_must_be_strictly_in_the_future() {
        let now = Utc::now();
        assert_eq!(validity(None, now), Validity::Unbounded);
        assert_eq!(validity(Some(now), now), Validity::Expired);
        assert_eq!(
            validity(Some(now - TimeDelta::seconds(1)), now),
            Validity::Expired
        );
        assert_eq!(
            validity(Some(now + TimeDelta::seconds(30)), now),
            Validity::Remaining(Duration::from_secs(30))
        );
    }

    #[test]
    fn ttl_is_clamped_to_remaining_validity() {
        let ttl = Duration::from_secs(300);
        assert_eq!(clamp_ttl(ttl, Validity::Unbounded), ttl);
        assert_eq!(
            clamp_ttl(ttl, Validity::Remaining(Duration::from_secs(10))),
            Duration::from_secs(10)
        );
        assert_eq!(
            clamp_ttl(ttl, Validity::Remaining(Duration::from_secs(900))),
            ttl
        );
    }
}
