#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Runnable zero-trust gateway: configuration, logging and the HTTP server
//! around the tenant guard.

pub mod config;
pub mod logging;
pub mod server;

pub use config::{AppConfig, LoggingConfig, ServerConfig};
pub use server::{build_router, run};
