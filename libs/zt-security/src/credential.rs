//! Request credentials.
//!
//! Both credential types live only for the duration of one request. The raw
//! API key is wrapped in a [`SecretString`] so `Debug` never prints it; the
//! guard hashes it once and works with the [`KeyHash`] from then on.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::keys::KeyHash;

/// Raw API key as presented in the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(SecretString::from(raw.into()))
    }

    /// One-way hash used for store lookups and cache keys.
    #[must_use]
    pub fn hash(&self) -> KeyHash {
        KeyHash::derive(self.0.expose_secret().as_bytes())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

/// Opaque session token. Used as the lookup key directly.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// `sha256:<hex>` fingerprint of a secret value, for correlating audit
/// records without retaining the secret itself.
#[must_use]
pub fn fingerprint(value: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(value)))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("sk_live_very_secret");
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("sk_live_very_secret"));
    }

    #[test]
    fn api_key_hash_matches_key_derivation() {
        let key = ApiKey::new("sk_live_1");
        assert_eq!(key.hash(), KeyHash::derive(b"sk_live_1"));
    }

    #[test]
    fn session_token_debug_is_redacted() {
        let token = SessionToken::new("session_abc");
        assert_eq!(format!("{token:?}"), "SessionToken([REDACTED])");
        assert_eq!(token.as_str(), "session_abc");
    }

    #[test]
    fn fingerprint_has_prefix_and_hides_input() {
        let fp = fingerprint(b"Bearer secret");
        assert!(fp.starts_with("sha256:"));
        assert!(!fp.contains("secret"));
        assert_eq!(fp.len(), "sha256:".len() + 64);
    }
}
