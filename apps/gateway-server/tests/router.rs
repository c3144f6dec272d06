#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::body::Body;
use gateway_server::build_router;
use http::{Request, StatusCode, header};
use static_store_plugin::{Service, StaticStoreConfig};
use tenant_guard::TenantGuard;
use tower::ServiceExt;

fn router() -> axum::Router {
    let store: StaticStoreConfig = serde_json::from_value(serde_json::json!({
        "tenants": [{"name": "acme", "api_key": "key_acme"}],
        "sessions": [
            {"token": "session_alice", "tenant": "acme", "user_bk": "user_alice", "user_label": "Alice"}
        ]
    }))
    .unwrap();
    let guard = TenantGuard::builder(Arc::new(Service::from_config(&store).unwrap()))
        .build()
        .unwrap();
    build_router(Arc::new(guard))
}

#[tokio::test]
async fn health_is_open_and_gets_a_request_id() {
    let response = router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn incoming_request_id_is_propagated() {
    let response = router()
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn whoami_requires_credentials() {
    let response = router()
        .oneshot(Request::get("/api/v1/whoami").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_returns_guard_context() {
    let response = router()
        .oneshot(
            Request::get("/api/v1/whoami")
                .header(header::AUTHORIZATION, "Bearer key_acme")
                .header("x-session-token", "session_alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["zero-trust-status"], "validated");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["tenant"]["tenant_name"], "acme");
    assert_eq!(json["user"]["user_label"], "Alice");
}
