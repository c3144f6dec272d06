//! Transport-neutral view of an inbound request.
//!
//! The middleware builds an [`InboundRequest`] from the axum request; the
//! pipeline itself never touches axum types, which keeps it testable
//! without a router.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use http::{HeaderMap, HeaderName, Method};
use serde_json::Value;
use zt_security::fingerprint;

/// Best-effort parsed body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    /// Bytes were present but not valid JSON. Treated as empty.
    Unparsable,
    /// The body could not be read at all (too large, transport error).
    Unreadable(String),
}

impl RequestBody {
    /// Parse raw bytes. Never fails; invalid JSON becomes [`RequestBody::Unparsable`].
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        serde_json::from_slice(bytes).map_or(Self::Unparsable, Self::Json)
    }

    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub path_params: Vec<(String, String)>,
    pub query_params: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub client_addr: Option<SocketAddr>,
    pub body: RequestBody,
}

impl InboundRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            path_params: Vec::new(),
            query_params: Vec::new(),
            headers: HeaderMap::new(),
            client_addr: None,
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_path_params(mut self, params: Vec<(String, String)>) -> Self {
        self.path_params = params;
        self
    }

    #[must_use]
    pub fn with_query_params(mut self, params: Vec<(String, String)>) -> Self {
        self.query_params = params;
        self
    }

    #[must_use]
    pub fn with_client_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.client_addr = addr;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
    }

    /// Check if this is a CORS preflight request
    ///
    /// Preflight requests are OPTIONS requests with:
    /// - Origin header
    /// - Access-Control-Request-Method header
    #[must_use]
    pub fn is_preflight(&self) -> bool {
        self.method == Method::OPTIONS
            && self.headers.contains_key(http::header::ORIGIN)
            && self
                .headers
                .contains_key(http::header::ACCESS_CONTROL_REQUEST_METHOD)
    }
}

/// Request facts copied into audit records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub method: String,
    pub path: String,
    pub client_addr: Option<String>,
    pub user_agent: Option<String>,
    /// All request headers. Values of `sensitive` headers are fingerprinted.
    pub headers: BTreeMap<String, String>,
}

impl RequestMeta {
    /// Capture `req`, replacing each header named in `sensitive` with a
    /// `sha256:` fingerprint of its value.
    #[must_use]
    pub fn capture(req: &InboundRequest, sensitive: &[HeaderName]) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &req.headers {
            let rendered = if sensitive.contains(name) {
                fingerprint(value.as_bytes())
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            headers
                .entry(name.as_str().to_owned())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&rendered);
                })
                .or_insert(rendered);
        }

        Self {
            method: req.method.to_string(),
            path: req.path.clone(),
            client_addr: req.client_addr.map(|a| a.to_string()),
            user_agent: req.user_agent().map(str::to_owned),
            headers,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    #[test]
    fn body_parsing_is_best_effort() {
        assert_eq!(RequestBody::from_bytes(b""), RequestBody::Empty);
        assert_eq!(RequestBody::from_bytes(b"  \n"), RequestBody::Empty);
        assert_eq!(RequestBody::from_bytes(b"{not json"), RequestBody::Unparsable);
        assert_eq!(
            RequestBody::from_bytes(br#"{"a":1}"#),
            RequestBody::Json(json!({"a": 1}))
        );
        assert!(RequestBody::Unparsable.json().is_none());
    }

    #[test]
    fn preflight_requires_origin_and_request_method() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::ORIGIN, HeaderValue::from_static("https://app"));
        let req = InboundRequest::new(Method::OPTIONS, "/api").with_headers(headers.clone());
        assert!(!req.is_preflight());

        headers.insert(
            http::header::ACCESS_CONTROL_REQUEST_METHOD,
            HeaderValue::from_static("POST"),
        );
        let req = InboundRequest::new(Method::OPTIONS, "/api").with_headers(headers);
        assert!(req.is_preflight());
    }

    #[test]
    fn meta_fingerprints_sensitive_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer raw_secret"),
        );
        headers.insert(http::header::USER_AGENT, HeaderValue::from_static("curl/8"));
        headers.append("x-trace", HeaderValue::from_static("a"));
        headers.append("x-trace", HeaderValue::from_static("b"));
        let req = InboundRequest::new(Method::GET, "/api/v1/assets")
            .with_headers(headers)
            .with_client_addr(Some("10.0.0.1:4000".parse().unwrap()));

        let meta = RequestMeta::capture(&req, &[http::header::AUTHORIZATION]);

        let auth = &meta.headers["authorization"];
        assert!(auth.starts_with("sha256:"));
        assert!(!auth.contains("raw_secret"));
        assert_eq!(meta.headers["user-agent"], "curl/8");
        assert_eq!(meta.headers["x-trace"], "a, b");
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8"));
        assert_eq!(meta.client_addr.as_deref(), Some("10.0.0.1:4000"));
        assert_eq!(meta.method, "GET");
    }
}
