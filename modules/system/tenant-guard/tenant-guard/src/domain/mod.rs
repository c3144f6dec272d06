pub mod audit;
mod deadline;
pub mod error;
pub mod metrics;
pub mod ownership;
pub mod resolver;
pub mod service;

pub use audit::{AUDIT_TARGET, AuditEmitter, TracingAuditSink};
pub use error::{GuardError, OwnershipFailure, ResolutionFailure};
pub use metrics::{CounterMetrics, MetricsSink, MetricsSnapshot, Outcome};
pub use ownership::{KindPolicy, OwnershipReport, OwnershipTable, OwnershipValidator};
pub use resolver::TenantResolver;
pub use service::{Decision, TenantGuard, TenantGuardBuilder};
