mod client;
mod service;

use thiserror::Error;

pub use service::Service;

/// Errors raised while loading a [`crate::StaticStoreConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StaticStoreError {
    #[error("tenant '{0}' is declared more than once")]
    DuplicateTenant(String),

    #[error("tenant '{0}' reuses an API key already bound to another tenant")]
    DuplicateApiKey(String),

    #[error("tenant '{0}' has an empty API key")]
    EmptyApiKey(String),

    #[error("{section} entry refers to unknown tenant '{tenant}'")]
    UnknownTenant {
        section: &'static str,
        tenant: String,
    },
}
