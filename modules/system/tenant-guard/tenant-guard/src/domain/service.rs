//! The guard orchestrator.

use std::sync::Arc;

use chrono::Utc;
use http::HeaderName;
use tenant_guard_sdk::{AuditAnnotation, AuditSink, TenantStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use zt_security::{GuardContext, SessionToken, TenantKey, UserKey};

use super::audit::{AuditEmitter, TracingAuditSink};
use super::error::GuardError;
use super::metrics::{CounterMetrics, MetricsSink, Outcome};
use super::ownership::{OwnershipTable, OwnershipValidator};
use super::resolver::TenantResolver;
use crate::cache::{CachedValidation, ValidationCache, spawn_cache_sweeper};
use crate::config::{ConfigError, TenantGuardConfig};
use crate::credentials::CredentialExtractor;
use crate::identifiers::IdentifierExtractor;
use crate::request::{InboundRequest, RequestBody, RequestMeta};

/// Terminal state of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Path is on the bypass list; nothing was checked or audited.
    Bypassed,
    Allowed(GuardContext),
    Denied(GuardError),
}

/// What had been resolved when the pipeline stopped.
#[derive(Debug, Default)]
struct Progress {
    tenant: Option<TenantKey>,
    user: Option<UserKey>,
    annotations: Vec<AuditAnnotation>,
}

/// Per-request enforcement pipeline.
///
/// Construct once with [`TenantGuard::builder`] and share behind an `Arc`.
/// The only state shared between requests is the validation cache.
pub struct TenantGuard {
    config: TenantGuardConfig,
    credentials: CredentialExtractor,
    identifiers: IdentifierExtractor,
    resolver: TenantResolver,
    ownership: OwnershipValidator,
    audit: AuditEmitter,
    metrics: Arc<dyn MetricsSink>,
    cache: Arc<ValidationCache<CachedValidation>>,
    sensitive_headers: Vec<HeaderName>,
}

impl TenantGuard {
    #[must_use]
    pub fn builder(store: Arc<dyn TenantStore>) -> TenantGuardBuilder {
        TenantGuardBuilder::new(store)
    }

    #[must_use]
    pub fn config(&self) -> &TenantGuardConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ValidationCache<CachedValidation>> {
        &self.cache
    }

    /// Start the background sweep of expired cache entries.
    #[must_use]
    pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        spawn_cache_sweeper(self.cache.clone(), self.config.sweep_interval(), cancel)
    }

    /// Is `req` exempt from the pipeline?
    ///
    /// Prefix match on `bypass_prefixes`, exact match on `bypass_exact`, and
    /// CORS preflight requests.
    #[must_use]
    pub fn is_bypassed(&self, req: &InboundRequest) -> bool {
        req.is_preflight()
            || self.config.bypass_exact.iter().any(|p| req.path == *p)
            || self
                .config
                .bypass_prefixes
                .iter()
                .any(|p| req.path.starts_with(p.as_str()))
    }

    /// Run the full pipeline for `req`.
    ///
    /// Steps run in a fixed order and the first failure wins. Every outcome
    /// except [`Decision::Bypassed`] produces exactly one audit record.
    pub async fn evaluate(&self, req: &InboundRequest) -> Decision {
        if self.is_bypassed(req) {
            tracing::trace!(path = %req.path, "tenant guard bypassed");
            self.metrics.record_outcome(Outcome::Bypassed);
            return Decision::Bypassed;
        }

        let mut progress = Progress::default();
        let result = self.run(req, &mut progress).await;
        let meta = RequestMeta::capture(req, &self.sensitive_headers);

        match result {
            Ok(ctx) => {
                self.audit
                    .record_success(&ctx, &meta, progress.annotations)
                    .await;
                self.metrics.record_outcome(Outcome::Allowed);
                Decision::Allowed(ctx)
            }
            Err(err) => {
                tracing::warn!(
                    method = %req.method,
                    path = %req.path,
                    status = err.status().as_u16(),
                    error = %err,
                    "request denied by tenant guard"
                );
                self.audit
                    .record_violation(
                        &meta,
                        &err,
                        progress.tenant,
                        progress.user,
                        progress.annotations,
                    )
                    .await;
                self.metrics.record_outcome(err.outcome());
                Decision::Denied(err)
            }
        }
    }

    async fn run(
        &self,
        req: &InboundRequest,
        progress: &mut Progress,
    ) -> Result<GuardContext, GuardError> {
        let credentials = self.credentials.extract(&req.headers)?;

        let tenant = self.resolver.resolve_tenant(&credentials.api_key).await?;
        progress.tenant = Some(tenant.tenant_key());

        let session = credentials.session_token.or_else(|| {
            req.body
                .json()
                .and_then(|body| self.identifiers.session_token_in_body(body))
                .map(SessionToken::new)
        });
        let user = match session {
            Some(token) => {
                let user = self.resolver.resolve_user(&token, &tenant).await?;
                progress.user = Some(user.user_key());
                Some(user)
            }
            None => None,
        };

        if let RequestBody::Unreadable(reason) = &req.body {
            return Err(GuardError::Internal(format!(
                "request body could not be read: {reason}"
            )));
        }
        let refs = self
            .identifiers
            .extract(&req.path_params, &req.query_params, req.body.json());

        let report = self.ownership.validate_all(&refs, &tenant).await;
        progress.annotations = report.annotations();
        if let Some(err) = report.failure {
            return Err(err);
        }

        GuardContext::builder()
            .tenant(tenant)
            .user(user)
            .validated_at(Utc::now())
            .build()
            .map_err(|e| GuardError::Internal(e.to_string()))
    }
}

/// Builder for [`TenantGuard`].
pub struct TenantGuardBuilder {
    store: Arc<dyn TenantStore>,
    config: TenantGuardConfig,
    audit_sink: Option<Arc<dyn AuditSink>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    cache: Option<Arc<ValidationCache<CachedValidation>>>,
}

impl TenantGuardBuilder {
    #[must_use]
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self {
            store,
            config: TenantGuardConfig::default(),
            audit_sink: None,
            metrics: None,
            cache: None,
        }
    }

    #[must_use]
    pub fn config(mut self, config: TenantGuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to [`TracingAuditSink`].
    #[must_use]
    pub fn audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    /// Defaults to a fresh [`CounterMetrics`].
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Defaults to an empty cache sized from the config.
    #[must_use]
    pub fn cache(mut self, cache: Arc<ValidationCache<CachedValidation>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// # Errors
    /// Returns [`ConfigError`] if the configuration does not validate.
    pub fn build(self) -> Result<TenantGuard, ConfigError> {
        let cfg = self.config;
        cfg.validate()?;

        let credentials = CredentialExtractor::from_config(&cfg)?;
        let sensitive_headers = vec![
            http::header::AUTHORIZATION,
            http::header::COOKIE,
            credentials.session_header().clone(),
        ];
        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(CounterMetrics::new()));
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(ValidationCache::new(cfg.cache_max_entries)));
        let sink = self
            .audit_sink
            .unwrap_or_else(|| Arc::new(TracingAuditSink));

        let resolver = TenantResolver::new(
            self.store.clone(),
            cache.clone(),
            metrics.clone(),
            cfg.tenant_ttl(),
            cfg.session_ttl(),
            cfg.store_timeout(),
        );
        let ownership = OwnershipValidator::new(
            self.store,
            cache.clone(),
            metrics.clone(),
            OwnershipTable::from_config(&cfg),
            &cfg,
        );

        Ok(TenantGuard {
            identifiers: IdentifierExtractor::from_config(&cfg),
            audit: AuditEmitter::new(sink, cfg.store_timeout()),
            credentials,
            resolver,
            ownership,
            metrics,
            cache,
            sensitive_headers,
            config: cfg,
        })
    }
}
