#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Tenant Guard SDK
//!
//! This crate defines the boundary between the tenant guard and the systems
//! it depends on:
//!
//! - [`TenantStore`] - Lookups against the persistent tenant/user/resource store
//! - [`AuditSink`] - Append-only destination for audit records
//! - [`ResourceKind`] / [`ResourceReference`] - Identifiers extracted from requests
//! - [`AuditRecord`] - What the guard emits for every decision
//! - [`StoreError`] / [`AuditSinkError`] - Error types
//!
//! ## Usage
//!
//! ```ignore
//! use tenant_guard_sdk::{OwnershipCheck, TenantStore};
//!
//! let owned = store
//!     .check_ownership(OwnershipCheck::Asset, "asset_123", &tenant_key)
//!     .await?;
//! ```

pub mod api;
pub mod error;
pub mod models;

pub use api::{AuditSink, TenantStore};
pub use error::{AuditSinkError, StoreError};
pub use models::{
    AuditAnnotation, AuditOutcome, AuditRecord, OwnershipCheck, ResourceKind, ResourceReference,
    SessionBinding, SessionStatus, TenantBinding,
};
