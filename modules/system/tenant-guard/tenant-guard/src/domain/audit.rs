//! Audit emission.
//!
//! Audit writes are best effort. [`AuditEmitter::emit`] is the one place
//! where a sink failure is logged and then dropped; nothing upstream ever
//! sees it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tenant_guard_sdk::{AuditAnnotation, AuditOutcome, AuditRecord, AuditSink, AuditSinkError};
use zt_security::{GuardContext, TenantKey, UserKey};

use super::deadline::{Bounded, within};
use super::error::GuardError;
use crate::request::RequestMeta;

/// Tracing target for audit events written by [`TracingAuditSink`].
pub const AUDIT_TARGET: &str = "tenant_guard::audit";

pub struct AuditEmitter {
    sink: Arc<dyn AuditSink>,
    timeout: Duration,
}

impl AuditEmitter {
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    /// Record an allowed request. Headers are never included.
    pub async fn record_success(
        &self,
        ctx: &GuardContext,
        meta: &RequestMeta,
        annotations: Vec<AuditAnnotation>,
    ) {
        let record = AuditRecord {
            outcome: AuditOutcome::Validated,
            tenant_key: Some(ctx.tenant_key()),
            user_key: ctx.user_key(),
            method: meta.method.clone(),
            path: meta.path.clone(),
            client_addr: meta.client_addr.clone(),
            user_agent: meta.user_agent.clone(),
            timestamp: ctx.validated_at(),
            reason: None,
            error_kind: None,
            headers: BTreeMap::new(),
            annotations,
        };
        self.emit(record).await;
    }

    /// Record a denied request with its internal reason and the captured
    /// headers. `tenant` and `user` are whatever had been resolved before
    /// the failing step.
    pub async fn record_violation(
        &self,
        meta: &RequestMeta,
        error: &GuardError,
        tenant: Option<TenantKey>,
        user: Option<UserKey>,
        annotations: Vec<AuditAnnotation>,
    ) {
        let record = AuditRecord {
            outcome: AuditOutcome::Violation,
            tenant_key: tenant,
            user_key: user,
            method: meta.method.clone(),
            path: meta.path.clone(),
            client_addr: meta.client_addr.clone(),
            user_agent: meta.user_agent.clone(),
            timestamp: Utc::now(),
            reason: Some(error.to_string()),
            error_kind: Some(error.kind().to_owned()),
            headers: meta.headers.clone(),
            annotations,
        };
        self.emit(record).await;
    }

    async fn emit(&self, record: AuditRecord) {
        match within(self.timeout, self.sink.append(&record)).await {
            Bounded::Done(()) => {}
            Bounded::Failed(e) => {
                tracing::warn!(error = %e, path = %record.path, "audit record discarded");
            }
            Bounded::TimedOut => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis(),
                    path = %record.path,
                    "audit sink timed out, record discarded"
                );
            }
        }
    }
}

/// Default sink: one structured tracing event per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditSinkError> {
        let tenant_key = record.tenant_key.map(|k| k.to_hex());
        let user_key = record.user_key.map(|k| k.to_hex());
        match record.outcome {
            AuditOutcome::Validated => tracing::info!(
                target: AUDIT_TARGET,
                outcome = "validated",
                tenant_key = tenant_key.as_deref(),
                user_key = user_key.as_deref(),
                method = %record.method,
                path = %record.path,
                client_addr = record.client_addr.as_deref(),
                user_agent = record.user_agent.as_deref(),
                annotations = ?record.annotations,
                "request validated"
            ),
            AuditOutcome::Violation => tracing::warn!(
                target: AUDIT_TARGET,
                outcome = "violation",
                tenant_key = tenant_key.as_deref(),
                user_key = user_key.as_deref(),
                method = %record.method,
                path = %record.path,
                client_addr = record.client_addr.as_deref(),
                user_agent = record.user_agent.as_deref(),
                error_kind = record.error_kind.as_deref(),
                reason = record.reason.as_deref(),
                headers = ?record.headers,
                annotations = ?record.annotations,
                "tenant isolation violation"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tenant_guard_sdk::ResourceKind;
    use zt_security::TenantIdentity;

    use crate::domain::error::ResolutionFailure;

    #[derive(Default)]
    struct Recording(Mutex<Vec<AuditRecord>>);

    #[async_trait]
    impl AuditSink for Recording {
        async fn append(&self, record: &AuditRecord) -> Result<(), AuditSinkError> {
            self.0.lock().push(record.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl AuditSink for Failing {
        async fn append(&self, _record: &AuditRecord) -> Result<(), AuditSinkError> {
            Err(AuditSinkError::Unavailable("disk full".to_owned()))
        }
    }

    struct Hanging;

    #[async_trait]
    impl AuditSink for Hanging {
        async fn append(&self, _record: &AuditRecord) -> Result<(), AuditSinkError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            method: "POST".to_owned(),
            path: "/api/v1/assets".to_owned(),
            client_addr: Some("10.1.1.1:5000".to_owned()),
            user_agent: Some("test-agent".to_owned()),
            headers: BTreeMap::from([("authorization".to_owned(), "sha256:abc".to_owned())]),
        }
    }

    fn context() -> GuardContext {
        GuardContext::builder()
            .tenant(TenantIdentity::new(TenantKey::derive(b"acme"), "acme"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn success_record_has_no_headers_or_reason() {
        let sink = Arc::new(Recording::default());
        let emitter = AuditEmitter::new(sink.clone(), Duration::from_secs(1));
        emitter.record_success(&context(), &meta(), Vec::new()).await;

        let records = sink.0.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, AuditOutcome::Validated);
        assert!(records[0].headers.is_empty());
        assert!(records[0].reason.is_none());
        assert_eq!(records[0].tenant_key, Some(TenantKey::derive(b"acme")));
    }

    #[tokio::test]
    async fn violation_record_keeps_reason_and_headers() {
        let sink = Arc::new(Recording::default());
        let emitter = AuditEmitter::new(sink.clone(), Duration::from_secs(1));
        let err = GuardError::Unauthorized(ResolutionFailure::KeyDeactivated);
        let annotations = vec![AuditAnnotation::UnrecognizedKind {
            kind: ResourceKind::Agent,
            value: "agent_1".to_owned(),
        }];
        emitter
            .record_violation(&meta(), &err, None, None, annotations)
            .await;

        let records = sink.0.lock();
        let record = &records[0];
        assert_eq!(record.outcome, AuditOutcome::Violation);
        assert_eq!(record.error_kind.as_deref(), Some("unauthorized"));
        assert!(record.reason.as_deref().unwrap().contains("deactivated"));
        assert_eq!(record.headers["authorization"], "sha256:abc");
        assert_eq!(record.annotations.len(), 1);
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        let emitter = AuditEmitter::new(Arc::new(Failing), Duration::from_secs(1));
        emitter.record_success(&context(), &meta(), Vec::new()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_sink_is_abandoned_after_timeout() {
        let emitter = AuditEmitter::new(Arc::new(Hanging), Duration::from_millis(100));
        emitter.record_success(&context(), &meta(), Vec::new()).await;
    }
}
