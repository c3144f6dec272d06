//! Domain errors for the tenant guard.

use http::StatusCode;
use tenant_guard_sdk::ResourceKind;
use thiserror::Error;

use super::metrics::Outcome;

/// Why an API key or session did not resolve.
///
/// The variants exist for the audit trail. Callers only ever see
/// [`GuardError::public_message`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    #[error("no tenant bound to the presented API key")]
    KeyNotFound,

    #[error("tenant binding is deactivated")]
    KeyDeactivated,

    #[error("tenant binding has expired")]
    KeyExpired,

    #[error("no session for this token under the resolved tenant")]
    SessionNotFound,

    #[error("session is not active")]
    SessionInactive,

    #[error("session has expired")]
    SessionExpired,

    #[error("store failure during resolution: {0}")]
    StoreFailure(String),

    #[error("store did not answer within the resolution timeout")]
    StoreTimeout,
}

impl ResolutionFailure {
    fn is_session(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound | Self::SessionInactive | Self::SessionExpired
        )
    }
}

/// Why a reference failed its ownership proof.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OwnershipFailure {
    #[error("not owned by the resolved tenant")]
    NotOwned,

    #[error("ownership lookup failed: {0}")]
    StoreFailure(String),

    #[error("ownership lookup timed out")]
    StoreTimeout,
}

/// Every way the pipeline can deny a request.
///
/// `Display` is the internal reason and goes to the audit trail only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("unauthorized: {0}")]
    Unauthorized(ResolutionFailure),

    #[error("forbidden: {kind} '{value}' {cause}")]
    Forbidden {
        kind: ResourceKind,
        value: String,
        cause: OwnershipFailure,
    },

    #[error("internal validation error: {0}")]
    Internal(String),
}

impl GuardError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Generic message safe to return to the caller.
    ///
    /// The three session failures share one message, so a session that
    /// exists under another tenant looks exactly like a missing one.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "Authentication required",
            Self::Unauthorized(failure) if failure.is_session() => "Invalid or expired session",
            Self::Unauthorized(_) => "Invalid or expired credentials",
            Self::Forbidden { .. } => "Access to the requested resource is not permitted",
            Self::Internal(_) => "Request could not be validated",
        }
    }

    /// Short error class recorded in audit records.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::Internal(_) => "internal",
        }
    }

    #[must_use]
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Unauthenticated(_) => Outcome::Unauthenticated,
            Self::Unauthorized(_) => Outcome::Unauthorized,
            Self::Forbidden { .. } => Outcome::Forbidden,
            Self::Internal(_) => Outcome::Internal,
        }
    }
}

impl From<ResolutionFailure> for GuardError {
    fn from(failure: ResolutionFailure) -> Self {
        Self::Unauthorized(failure)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            GuardError::Unauthenticated("x".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            GuardError::Unauthorized(ResolutionFailure::KeyExpired).status(),
            StatusCode::UNAUTHORIZED
        );
        let forbidden = GuardError::Forbidden {
            kind: ResourceKind::Asset,
            value: "asset_1".into(),
            cause: OwnershipFailure::NotOwned,
        };
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            GuardError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn session_failures_are_indistinguishable_to_the_caller() {
        let messages: Vec<_> = [
            ResolutionFailure::SessionNotFound,
            ResolutionFailure::SessionInactive,
            ResolutionFailure::SessionExpired,
        ]
        .into_iter()
        .map(|f| GuardError::from(f).public_message())
        .collect();
        assert!(messages.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn public_message_hides_internal_reason() {
        let err = GuardError::Forbidden {
            kind: ResourceKind::Asset,
            value: "asset_999".into(),
            cause: OwnershipFailure::StoreFailure("db down".into()),
        };
        assert!(err.to_string().contains("asset_999"));
        assert!(!err.public_message().contains("asset_999"));
        assert!(!err.public_message().contains("db down"));
    }
}
