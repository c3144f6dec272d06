#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
pub mod context;
pub mod credential;
pub mod identity;
pub mod keys;

pub use context::{ContextError, GuardContext};
pub use credential::{ApiKey, SessionToken, fingerprint};
pub use identity::{TenantIdentity, UserIdentity};
pub use keys::{KEY_LEN, KeyHash, KeyParseError, TenantKey, UserKey};
