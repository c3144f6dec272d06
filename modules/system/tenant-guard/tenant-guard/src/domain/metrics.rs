//! Injected metrics sink.
//!
//! The guard owns an `Arc<dyn MetricsSink>` handed to it at construction, so
//! separate guard instances never share counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tenant_guard_sdk::ResourceKind;

/// Terminal state of one pass through the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allowed,
    Bypassed,
    Unauthenticated,
    Unauthorized,
    Forbidden,
    Internal,
}

pub trait MetricsSink: Send + Sync {
    fn record_outcome(&self, outcome: Outcome);
    fn record_cache_lookup(&self, hit: bool);
    fn record_unrecognized_kind(&self, kind: ResourceKind);
}

/// In-process counters.
#[derive(Debug, Default)]
pub struct CounterMetrics {
    allowed: AtomicU64,
    bypassed: AtomicU64,
    unauthenticated: AtomicU64,
    unauthorized: AtomicU64,
    forbidden: AtomicU64,
    internal: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    unrecognized_kinds: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub allowed: u64,
    pub bypassed: u64,
    pub unauthenticated: u64,
    pub unauthorized: u64,
    pub forbidden: u64,
    pub internal: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub unrecognized_kinds: u64,
}

impl MetricsSnapshot {
    #[must_use]
    pub fn denied(&self) -> u64 {
        self.unauthenticated + self.unauthorized + self.forbidden + self.internal
    }
}

impl CounterMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            allowed: load(&self.allowed),
            bypassed: load(&self.bypassed),
            unauthenticated: load(&self.unauthenticated),
            unauthorized: load(&self.unauthorized),
            forbidden: load(&self.forbidden),
            internal: load(&self.internal),
            cache_hits: load(&self.cache_hits),
            cache_misses: load(&self.cache_misses),
            unrecognized_kinds: load(&self.unrecognized_kinds),
        }
    }
}

impl MetricsSink for CounterMetrics {
    fn record_outcome(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Allowed => &self.allowed,
            Outcome::Bypassed => &self.bypassed,
            Outcome::Unauthenticated => &self.unauthenticated,
            Outcome::Unauthorized => &self.unauthorized,
            Outcome::Forbidden => &self.forbidden,
            Outcome::Internal => &self.internal,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cache_lookup(&self, hit: bool) {
        let counter = if hit {
            &self.cache_hits
        } else {
            &self.cache_misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_unrecognized_kind(&self, _kind: ResourceKind) {
        self.unrecognized_kinds.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let m = CounterMetrics::new();
        m.record_outcome(Outcome::Allowed);
        m.record_outcome(Outcome::Forbidden);
        m.record_outcome(Outcome::Forbidden);
        m.record_cache_lookup(true);
        m.record_cache_lookup(false);
        m.record_unrecognized_kind(ResourceKind::Agent);

        let snap = m.snapshot();
        assert_eq!(snap.allowed, 1);
        assert_eq!(snap.forbidden, 2);
        assert_eq!(snap.denied(), 2);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.unrecognized_kinds, 1);
    }

    #[test]
    fn separate_instances_do_not_share_state() {
        let a = CounterMetrics::new();
        let b = CounterMetrics::new();
        a.record_outcome(Outcome::Allowed);
        assert_eq!(b.snapshot(), MetricsSnapshot::default());
    }
}
