//! HTTP server assembly and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use static_store_plugin::Service;
use tenant_guard::{CounterMetrics, Guarded, TenantGuard, guard_router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use crate::config::AppConfig;

/// Application router: every route sits behind the tenant guard.
///
/// Layer order, outermost first: set request id, propagate it to the
/// response, trace, then the guard on matched routes.
pub fn build_router(guard: Arc<TenantGuard>) -> Router {
    let routes = Router::new()
        .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
        .route(
            "/api/v1/whoami",
            get(|Guarded(ctx): Guarded| async move { Json(ctx) }),
        );

    guard_router(routes, guard)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                    let rid = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("n/a");
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        path = %req.uri().path(),
                        request_id = %rid,
                        status = Empty,
                        latency_ms = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<axum::body::Body>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("status", res.status().as_u16());
                        span.record("latency_ms", latency.as_millis());
                    },
                ),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Build the guard from `config`, serve until Ctrl-C, then shut down.
///
/// # Errors
/// Returns an error if the store or guard cannot be built, the listener
/// cannot bind, or the server fails.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let store = Service::from_config(&config.store).context("invalid store configuration")?;
    let metrics = Arc::new(CounterMetrics::new());
    let guard = TenantGuard::builder(Arc::new(store))
        .config(config.guard)
        .metrics(metrics.clone())
        .build()
        .context("invalid tenant guard configuration")?;
    let guard = Arc::new(guard);

    let cancel = CancellationToken::new();
    let sweeper = guard.spawn_sweeper(cancel.child_token());

    let listener = TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "tenant guard gateway listening");

    tokio::spawn(shutdown_on_ctrl_c(cancel.clone()));

    let shutdown = cancel.clone();
    axum::serve(
        listener,
        build_router(guard).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .context("server error")?;

    cancel.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "cache sweeper ended abnormally");
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        allowed = snapshot.allowed,
        bypassed = snapshot.bypassed,
        denied = snapshot.denied(),
        cache_hits = snapshot.cache_hits,
        cache_misses = snapshot.cache_misses,
        unrecognized_kinds = snapshot.unrecognized_kinds,
        "tenant guard gateway stopped"
    );
    Ok(())
}

async fn shutdown_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
    }
    cancel.cancel();
}
