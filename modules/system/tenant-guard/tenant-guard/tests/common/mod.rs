#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

//! Shared fixtures for the tenant guard integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use static_store_plugin::{MemoryAuditSink, Service, StaticStoreConfig};
use tenant_guard::{CounterMetrics, TenantGuard, TenantGuardConfig};
use tenant_guard_sdk::{OwnershipCheck, SessionBinding, StoreError, TenantBinding, TenantStore};
use zt_security::{KeyHash, SessionToken, TenantKey};

pub const ACME_KEY: &str = "key_acme";
pub const GLOBEX_KEY: &str = "key_globex";
pub const RETIRED_KEY: &str = "key_retired";
pub const LAPSED_KEY: &str = "key_lapsed";

/// Injected store behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    Healthy,
    FailTenantLookup,
    HangTenantLookup,
    FailSessionLookup,
    FailOwnership,
    HangOwnership,
}

/// Wraps the static store, counting calls and injecting faults.
pub struct CountingStore {
    inner: Service,
    fault: Mutex<Fault>,
    pub tenant_calls: AtomicUsize,
    pub session_calls: AtomicUsize,
    pub ownership_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Service) -> Self {
        Self {
            inner,
            fault: Mutex::new(Fault::Healthy),
            tenant_calls: AtomicUsize::new(0),
            session_calls: AtomicUsize::new(0),
            ownership_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock() = fault;
    }

    fn fault(&self) -> Fault {
        *self.fault.lock()
    }

    pub fn ownership_calls(&self) -> usize {
        self.ownership_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.tenant_calls.load(Ordering::SeqCst)
            + self.session_calls.load(Ordering::SeqCst)
            + self.ownership_calls.load(Ordering::SeqCst)
    }

    pub fn tenant_key(&self, name: &str) -> TenantKey {
        self.inner.tenant_key(name).expect("fixture tenant")
    }
}

#[async_trait]
impl TenantStore for CountingStore {
    async fn lookup_tenant_by_key_hash(
        &self,
        hash: &KeyHash,
    ) -> Result<Option<TenantBinding>, StoreError> {
        self.tenant_calls.fetch_add(1, Ordering::SeqCst);
        match self.fault() {
            Fault::FailTenantLookup => Err(StoreError::Unavailable("connection refused".into())),
            Fault::HangTenantLookup => std::future::pending().await,
            _ => self.inner.lookup_tenant_by_key_hash(hash).await,
        }
    }

    async fn lookup_user_by_session_and_tenant(
        &self,
        token: &SessionToken,
        tenant: &TenantKey,
    ) -> Result<Option<SessionBinding>, StoreError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        if self.fault() == Fault::FailSessionLookup {
            return Err(StoreError::Malformed("session row".into()));
        }
        self.inner
            .lookup_user_by_session_and_tenant(token, tenant)
            .await
    }

    async fn check_ownership(
        &self,
        check: OwnershipCheck,
        value: &str,
        tenant: &TenantKey,
    ) -> Result<bool, StoreError> {
        self.ownership_calls.fetch_add(1, Ordering::SeqCst);
        match self.fault() {
            Fault::FailOwnership => Err(StoreError::Internal("query failed".into())),
            Fault::HangOwnership => std::future::pending().await,
            _ => self.inner.check_ownership(check, value, tenant).await,
        }
    }
}

/// Two tenants with some sessions and resources, plus a deactivated and an
/// expired binding.
pub fn store_config() -> StaticStoreConfig {
    serde_json::from_value(json!({
        "tenants": [
            {"name": "acme", "api_key": ACME_KEY},
            {"name": "globex", "api_key": GLOBEX_KEY},
            {"name": "retired", "api_key": RETIRED_KEY, "active": false},
            {"name": "lapsed", "api_key": LAPSED_KEY, "expires_at": "2020-01-01T00:00:00Z"}
        ],
        "sessions": [
            {"token": "session_alice", "tenant": "acme", "user_bk": "user_alice", "user_label": "Alice"},
            {"token": "session_bob", "tenant": "globex", "user_bk": "user_bob", "user_label": "Bob"},
            {"token": "session_carol", "tenant": "acme", "user_bk": "user_carol", "status": "revoked"}
        ],
        "resources": [
            {"kind": "asset", "value": "asset_100", "tenant": "acme"},
            {"kind": "asset", "value": "asset_999", "tenant": "globex"},
            {"kind": "transaction", "value": "transaction_1", "tenant": "acme"},
            {"kind": "email", "value": "alice@acme.io", "tenant": "acme"}
        ]
    }))
    .expect("fixture config")
}

pub struct Harness {
    pub guard: Arc<TenantGuard>,
    pub store: Arc<CountingStore>,
    pub audit: Arc<MemoryAuditSink>,
    pub metrics: Arc<CounterMetrics>,
}

pub fn harness() -> Harness {
    harness_with(TenantGuardConfig::default())
}

pub fn harness_with(config: TenantGuardConfig) -> Harness {
    let store = Arc::new(CountingStore::new(
        Service::from_config(&store_config()).expect("fixture store"),
    ));
    let audit = Arc::new(MemoryAuditSink::new());
    let metrics = Arc::new(CounterMetrics::new());
    let guard = TenantGuard::builder(store.clone())
        .config(config)
        .audit_sink(audit.clone())
        .metrics(metrics.clone())
        .build()
        .expect("valid guard config");
    Harness {
        guard: Arc::new(guard),
        store,
        audit,
        metrics,
    }
}
