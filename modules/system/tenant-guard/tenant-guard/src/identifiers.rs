//! Identifier extraction.
//!
//! Walks path parameters, query parameters and the parsed JSON body and
//! collects every value that might name a tenant-owned resource. Every value
//! yields a generic `field:value` reference; values shaped like a business
//! key or an email additionally yield a typed reference.
//!
//! Extraction never fails. Malformed input produces fewer references, never
//! an error.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tenant_guard_sdk::{ResourceKind, ResourceReference};

use crate::config::TenantGuardConfig;

/// Body field that may carry a session credential.
pub const SESSION_TOKEN_FIELD: &str = "session_token";

/// Field path used for a body that is a bare scalar.
const ROOT_FIELD: &str = "body";

#[allow(clippy::expect_used)]
static PREFIXED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(user|asset|transaction|session|agent|tenant)_[A-Za-z0-9][A-Za-z0-9_\-]*$")
        .expect("valid business-key regex")
});

#[allow(clippy::expect_used)]
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("valid email regex")
});

/// Classify a raw value by its shape.
///
/// Returns `None` for values that are not recognisable identifiers.
#[must_use]
pub fn classify(value: &str) -> Option<ResourceKind> {
    if let Some(caps) = PREFIXED_KEY.captures(value) {
        return caps
            .get(1)
            .and_then(|prefix| prefix.as_str().parse::<ResourceKind>().ok());
    }
    if EMAIL.is_match(value) {
        return Some(ResourceKind::Email);
    }
    None
}

#[derive(Debug, Clone)]
pub struct IdentifierExtractor {
    non_identifier_fields: HashSet<String>,
    max_depth: usize,
}

impl IdentifierExtractor {
    #[must_use]
    pub fn new<I, S>(non_identifier_fields: I, max_depth: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            non_identifier_fields: non_identifier_fields.into_iter().map(Into::into).collect(),
            max_depth,
        }
    }

    #[must_use]
    pub fn from_config(cfg: &TenantGuardConfig) -> Self {
        Self::new(cfg.non_identifier_fields.iter().cloned(), cfg.max_body_depth)
    }

    /// Collect every reference in `path_params`, `query_params` and `body`.
    #[must_use]
    pub fn extract(
        &self,
        path_params: &[(String, String)],
        query_params: &[(String, String)],
        body: Option<&Value>,
    ) -> BTreeSet<ResourceReference> {
        let mut refs = BTreeSet::new();
        for (name, value) in path_params.iter().chain(query_params) {
            self.push_scalar(&mut refs, name, name, value);
        }
        if let Some(body) = body {
            self.walk(&mut refs, body, "", None, 0);
        }
        refs
    }

    /// First non-empty `session_token` string anywhere in `body`.
    #[must_use]
    pub fn session_token_in_body(&self, body: &Value) -> Option<String> {
        self.find_session_token(body, 0)
    }

    fn find_session_token(&self, value: &Value, depth: usize) -> Option<String> {
        if depth > self.max_depth {
            return None;
        }
        match value {
            Value::Object(map) => {
                if let Some(Value::String(token)) = map.get(SESSION_TOKEN_FIELD) {
                    let token = token.trim();
                    if !token.is_empty() {
                        return Some(token.to_owned());
                    }
                }
                map.values()
                    .find_map(|v| self.find_session_token(v, depth + 1))
            }
            Value::Array(items) => items
                .iter()
                .find_map(|v| self.find_session_token(v, depth + 1)),
            _ => None,
        }
    }

    /// Depth-first walk. `path` is the dotted field path so far; `field` is
    /// the innermost object key, used for the non-identifier check.
    fn walk(
        &self,
        refs: &mut BTreeSet<ResourceReference>,
        value: &Value,
        path: &str,
        field: Option<&str>,
        depth: usize,
    ) {
        if depth > self.max_depth {
            tracing::debug!(path, depth, "body walk depth cap reached");
            return;
        }
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    self.walk(refs, child, &child_path, Some(key.as_str()), depth + 1);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    let child_path = format!("{path}[{i}]");
                    self.walk(refs, child, &child_path, field, depth + 1);
                }
            }
            Value::String(s) => {
                let path = if path.is_empty() { ROOT_FIELD } else { path };
                self.push_scalar(refs, path, field.unwrap_or(ROOT_FIELD), s);
            }
            Value::Number(n) => {
                let path = if path.is_empty() { ROOT_FIELD } else { path };
                refs.insert(ResourceReference::unclassified(path, &n.to_string()));
            }
            Value::Bool(_) | Value::Null => {}
        }
    }

    fn push_scalar(
        &self,
        refs: &mut BTreeSet<ResourceReference>,
        path: &str,
        field: &str,
        value: &str,
    ) {
        refs.insert(ResourceReference::unclassified(path, value));
        if self.non_identifier_fields.contains(field) {
            return;
        }
        if let Some(kind) = classify(value) {
            refs.insert(ResourceReference::new(kind, value));
        }
    }
}
