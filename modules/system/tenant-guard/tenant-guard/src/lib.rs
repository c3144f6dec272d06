#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Tenant Guard
//!
//! Zero-trust enforcement layer that binds every request to a tenant and
//! proves that every identifier in the request belongs to that tenant
//! before the request reaches a business handler.
//!
//! Pipeline, in order:
//!
//! 1. [`credentials`] - API key and session token from the request
//! 2. [`domain::resolver`] - tenant (and optional user) resolution
//! 3. [`identifiers`] - every candidate identifier in path, query and body
//! 4. [`domain::ownership`] - ownership proof per identifier, cache first
//! 5. [`domain::audit`] - audit record for the outcome
//!
//! [`TenantGuard`] composes the steps; [`middleware`] plugs it into axum.

pub mod cache;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod identifiers;
pub mod middleware;
pub mod request;

pub use cache::{CachedValidation, ValidationCache, spawn_cache_sweeper};
pub use config::{ConfigError, TenantGuardConfig};
pub use domain::{
    AuditEmitter, CounterMetrics, Decision, GuardError, MetricsSink, MetricsSnapshot, Outcome,
    OwnershipFailure, ResolutionFailure, TenantGuard, TenantGuardBuilder, TracingAuditSink,
};
pub use middleware::{Guarded, guard_router, tenant_guard_middleware};
pub use request::{InboundRequest, RequestBody, RequestMeta};
