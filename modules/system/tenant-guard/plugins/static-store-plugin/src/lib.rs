#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static Tenant Store Plugin
//!
//! In-memory [`tenant_guard_sdk::TenantStore`] built from configuration, plus
//! an in-memory [`tenant_guard_sdk::AuditSink`]. Meant for local
//! deployments, demos and tests.
//!
//! ## Configuration
//!
//! ```yaml
//! store:
//!   tenants:
//!     - name: acme
//!       api_key: "tg_acme_key"
//!   sessions:
//!     - token: session_alice
//!       tenant: acme
//!       user_bk: user_alice
//!       user_label: Alice
//!   resources:
//!     - kind: asset
//!       value: asset_100
//!       tenant: acme
//! ```

pub mod audit;
pub mod config;
pub mod domain;

pub use audit::MemoryAuditSink;
pub use config::StaticStoreConfig;
pub use domain::{Service, StaticStoreError};
