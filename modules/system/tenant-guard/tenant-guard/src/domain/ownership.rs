//! Resource ownership validation.
//!
//! Each reference kind maps to one [`KindPolicy`]. Unclassified references
//! are skipped, kinds in the [`OwnershipTable`] are proven against the store,
//! and every other kind is allowed and flagged for audit review.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tenant_guard_sdk::{
    AuditAnnotation, OwnershipCheck, ResourceKind, ResourceReference, TenantStore,
};
use zt_security::{TenantIdentity, TenantKey};

use super::deadline::{Bounded, within};
use super::error::{GuardError, OwnershipFailure};
use super::metrics::MetricsSink;
use crate::cache::{CachedValidation, ValidationCache, ownership_cache_key};
use crate::config::TenantGuardConfig;

/// What the validator does with a reference of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindPolicy {
    /// Not an identifier. Never checked, never cached.
    Skip,
    /// Proven with this store check.
    Check(OwnershipCheck),
    /// Allowed without a check and flagged.
    Unrecognized,
}

/// Known-kind table.
#[derive(Debug, Clone, Default)]
pub struct OwnershipTable {
    checks: BTreeMap<ResourceKind, OwnershipCheck>,
}

impl OwnershipTable {
    /// Kinds without a store check are ignored.
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        let checks = kinds
            .into_iter()
            .filter_map(|kind| kind.ownership_check().map(|check| (kind, check)))
            .collect();
        Self { checks }
    }

    #[must_use]
    pub fn from_config(cfg: &TenantGuardConfig) -> Self {
        Self::new(cfg.known_kinds.iter().copied())
    }

    #[must_use]
    pub fn policy(&self, kind: ResourceKind) -> KindPolicy {
        match kind {
            ResourceKind::Unclassified => KindPolicy::Skip,
            other => match self.checks.get(&other) {
                Some(check) => KindPolicy::Check(*check),
                None => KindPolicy::Unrecognized,
            },
        }
    }
}

/// Result of validating every reference of one request.
#[derive(Debug, Default)]
pub struct OwnershipReport {
    /// References proven owned.
    pub proven: usize,
    /// References allowed without a check.
    pub unrecognized: Vec<ResourceReference>,
    /// First failing reference, if any.
    pub failure: Option<GuardError>,
}

impl OwnershipReport {
    #[must_use]
    pub fn annotations(&self) -> Vec<AuditAnnotation> {
        self.unrecognized
            .iter()
            .map(|r| AuditAnnotation::UnrecognizedKind {
                kind: r.kind,
                value: r.value.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.failure.is_none()
    }
}

pub struct OwnershipValidator {
    store: Arc<dyn TenantStore>,
    cache: Arc<ValidationCache<CachedValidation>>,
    metrics: Arc<dyn MetricsSink>,
    table: OwnershipTable,
    ownership_ttl: Duration,
    session_ttl: Duration,
    timeout: Duration,
}

impl OwnershipValidator {
    #[must_use]
    pub fn new(
        store: Arc<dyn TenantStore>,
        cache: Arc<ValidationCache<CachedValidation>>,
        metrics: Arc<dyn MetricsSink>,
        table: OwnershipTable,
        cfg: &TenantGuardConfig,
    ) -> Self {
        Self {
            store,
            cache,
            metrics,
            table,
            ownership_ttl: cfg.ownership_ttl(),
            session_ttl: cfg.session_ttl(),
            timeout: cfg.store_timeout(),
        }
    }

    fn ttl_for(&self, kind: ResourceKind) -> Duration {
        if kind == ResourceKind::Session {
            self.session_ttl
        } else {
            self.ownership_ttl
        }
    }

    /// Validate `refs` against `tenant`, stopping at the first failure.
    ///
    /// Unrecognized kinds are collected up front so the report lists all of
    /// them even when a later check fails.
    pub async fn validate_all(
        &self,
        refs: &BTreeSet<ResourceReference>,
        tenant: &TenantIdentity,
    ) -> OwnershipReport {
        let tenant_key = tenant.tenant_key();
        let mut report = OwnershipReport::default();
        let mut to_check = Vec::new();

        for reference in refs {
            match self.table.policy(reference.kind) {
                KindPolicy::Skip => {}
                KindPolicy::Check(check) => to_check.push((check, reference)),
                KindPolicy::Unrecognized => {
                    tracing::warn!(
                        kind = %reference.kind,
                        value = %reference.value,
                        %tenant_key,
                        "unrecognized resource kind allowed without ownership check"
                    );
                    self.metrics.record_unrecognized_kind(reference.kind);
                    report.unrecognized.push(reference.clone());
                }
            }
        }

        for (check, reference) in to_check {
            if let Err(cause) = self.check_one(check, reference, tenant_key).await {
                tracing::info!(
                    kind = %reference.kind,
                    %tenant_key,
                    %cause,
                    "resource ownership check failed"
                );
                report.failure = Some(GuardError::Forbidden {
                    kind: reference.kind,
                    value: reference.value.clone(),
                    cause,
                });
                return report;
            }
            report.proven += 1;
        }
        report
    }

    async fn check_one(
        &self,
        check: OwnershipCheck,
        reference: &ResourceReference,
        tenant_key: TenantKey,
    ) -> Result<(), OwnershipFailure> {
        let key = ownership_cache_key(reference.kind, &reference.value, tenant_key);
        if let Some(CachedValidation::Ownership(owned)) = self.cache.get(&key) {
            self.metrics.record_cache_lookup(true);
            return owned.then_some(()).ok_or(OwnershipFailure::NotOwned);
        }
        self.metrics.record_cache_lookup(false);

        let lookup = self
            .store
            .check_ownership(check, &reference.value, &tenant_key);
        match within(self.timeout, lookup).await {
            Bounded::Done(owned) => {
                self.cache.put(
                    key,
                    CachedValidation::Ownership(owned),
                    self.ttl_for(reference.kind),
                );
                owned.then_some(()).ok_or(OwnershipFailure::NotOwned)
            }
            // Store failures are not cached.
            Bounded::Failed(e) => Err(OwnershipFailure::StoreFailure(e.to_string())),
            Bounded::TimedOut => Err(OwnershipFailure::StoreTimeout),
        }
    }
}
