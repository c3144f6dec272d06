//! Credential extraction.
//!
//! The API key is mandatory and only ever read from `Authorization: Bearer`.
//! The session token is optional: dedicated header first, then cookie. A
//! `session_token` field in the body is picked up later by the orchestrator.

use http::HeaderMap;
use http::HeaderName;
use zt_security::{ApiKey, SessionToken};

use crate::config::{ConfigError, TenantGuardConfig};
use crate::domain::GuardError;

/// Credentials pulled from a request.
#[derive(Debug, Clone)]
pub struct ExtractedCredentials {
    pub api_key: ApiKey,
    pub session_token: Option<SessionToken>,
}

#[derive(Debug, Clone)]
pub struct CredentialExtractor {
    session_header: HeaderName,
    session_cookie: String,
}

impl CredentialExtractor {
    #[must_use]
    pub fn new(session_header: HeaderName, session_cookie: impl Into<String>) -> Self {
        Self {
            session_header,
            session_cookie: session_cookie.into(),
        }
    }

    /// # Errors
    /// Returns [`ConfigError`] if the session header name is invalid.
    pub fn from_config(cfg: &TenantGuardConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(cfg.session_header_name()?, &cfg.session_cookie))
    }

    #[must_use]
    pub fn session_header(&self) -> &HeaderName {
        &self.session_header
    }

    /// Pull the API key and optional session token out of `headers`.
    ///
    /// # Errors
    /// Returns [`GuardError::Unauthenticated`] if the `Authorization` header is
    /// missing, uses another scheme, or carries an empty token.
    pub fn extract(&self, headers: &HeaderMap) -> Result<ExtractedCredentials, GuardError> {
        let Some(token) = extract_bearer_token(headers) else {
            return Err(GuardError::Unauthenticated(
                "missing or malformed Authorization header".to_owned(),
            ));
        };
        if token.is_empty() {
            return Err(GuardError::Unauthenticated(
                "empty bearer token".to_owned(),
            ));
        }

        let session_token = self
            .session_from_header(headers)
            .or_else(|| self.session_from_cookie(headers))
            .map(SessionToken::new);

        Ok(ExtractedCredentials {
            api_key: ApiKey::new(token),
            session_token,
        })
    }

    fn session_from_header(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(&self.session_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    }

    fn session_from_cookie(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.session_cookie)
            .map(|(_, value)| value.trim().to_owned())
            .filter(|s| !s.is_empty())
    }
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(str::trim))
}
