//! axum integration.
//!
//! [`guard_router`] installs [`tenant_guard_middleware`] as a route layer so
//! matched path parameters are visible to the identifier walk. Handlers read
//! the resolved identity through the [`Guarded`] extractor.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, FromRequestParts, RawPathParams, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use http::request::Parts;
use http::{HeaderName, HeaderValue};
use serde::Serialize;
use zt_security::GuardContext;

use crate::domain::{Decision, GuardError, TenantGuard};
use crate::request::{InboundRequest, RequestBody};

pub const TENANT_VALIDATED: &str = "tenant-validated";
pub const ZERO_TRUST_STATUS: &str = "zero-trust-status";
pub const VALIDATION_TIMESTAMP: &str = "validation-timestamp";

/// Wrap every route of `router` in the tenant guard.
pub fn guard_router<S>(router: Router<S>, guard: Arc<TenantGuard>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(axum::middleware::from_fn_with_state(
        guard,
        tenant_guard_middleware,
    ))
}

/// Tenant guard middleware.
///
/// For each request:
/// 1. Skips bypassed paths and CORS preflight before touching the body
/// 2. Buffers the body so identifiers in it can be checked
/// 3. Runs the pipeline and either forwards with security headers or denies
pub async fn tenant_guard_middleware(
    State(guard): State<Arc<TenantGuard>>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();
    let mut inbound = inbound_from_parts(&mut parts).await;

    if guard.is_bypassed(&inbound) {
        return next.run(Request::from_parts(parts, body)).await;
    }

    let bytes = match axum::body::to_bytes(body, guard.config().max_body_bytes).await {
        Ok(bytes) => {
            inbound.body = RequestBody::from_bytes(&bytes);
            bytes
        }
        Err(e) => {
            inbound.body = RequestBody::Unreadable(e.to_string());
            Bytes::new()
        }
    };

    match guard.evaluate(&inbound).await {
        Decision::Allowed(ctx) => {
            let validated_at = ctx.validated_at();
            parts.extensions.insert(ctx);
            let mut response = next.run(Request::from_parts(parts, Body::from(bytes))).await;
            let headers = response.headers_mut();
            headers.insert(
                HeaderName::from_static(TENANT_VALIDATED),
                HeaderValue::from_static("true"),
            );
            headers.insert(
                HeaderName::from_static(ZERO_TRUST_STATUS),
                HeaderValue::from_static("validated"),
            );
            if let Ok(ts) =
                HeaderValue::from_str(&validated_at.to_rfc3339_opts(SecondsFormat::Millis, true))
            {
                headers.insert(HeaderName::from_static(VALIDATION_TIMESTAMP), ts);
            }
            response
        }
        Decision::Bypassed => next.run(Request::from_parts(parts, Body::from(bytes))).await,
        Decision::Denied(err) => deny_response(&err),
    }
}

async fn inbound_from_parts(parts: &mut Parts) -> InboundRequest {
    let path_params = RawPathParams::from_request_parts(parts, &())
        .await
        .map(|params| {
            params
                .iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect()
        })
        .unwrap_or_default();
    let query_params = parts
        .uri
        .query()
        .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
        .unwrap_or_default();
    let client_addr = ConnectInfo::<SocketAddr>::from_request_parts(parts, &())
        .await
        .ok()
        .map(|ConnectInfo(addr)| addr);

    InboundRequest::new(parts.method.clone(), parts.uri.path())
        .with_headers(parts.headers.clone())
        .with_path_params(path_params)
        .with_query_params(query_params)
        .with_client_addr(client_addr)
}

#[derive(Serialize)]
struct DenyBody<'a> {
    error: &'static str,
    message: &'a str,
    timestamp: String,
    violation_type: &'static str,
}

fn deny_response(err: &GuardError) -> Response {
    let body = DenyBody {
        error: "Access Denied",
        message: err.public_message(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        violation_type: "tenant_isolation_breach",
    };
    (err.status(), Json(body)).into_response()
}

/// Extractor for the [`GuardContext`] attached by the middleware.
///
/// ```ignore
/// async fn whoami(Guarded(ctx): Guarded) -> Json<GuardContext> {
///     Json(ctx)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Guarded(pub GuardContext);

impl<S> FromRequestParts<S> for Guarded
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<GuardContext>()
            .cloned()
            .map(Guarded)
            .ok_or_else(|| {
                tracing::error!("GuardContext missing; route is not behind the tenant guard");
                deny_response(&GuardError::Internal(
                    "guard context missing from request".to_owned(),
                ))
            })
    }
}
