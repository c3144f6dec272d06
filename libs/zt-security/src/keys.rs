//! Fixed-width opaque keys.
//!
//! Every entity the guard talks about (tenants, users, hashed API keys) is
//! referenced by a 32-byte one-way digest. The raw business value never
//! travels with the key, so keys are safe to log, cache and put in audit
//! records. Keys serialize as lowercase hex.

use std::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Width in bytes of every opaque key.
pub const KEY_LEN: usize = 32;

/// Error returned when a hex string is not a valid opaque key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

fn decode_key(input: &str) -> Result<[u8; KEY_LEN], KeyParseError> {
    let trimmed = input.trim();
    if trimmed.len() != KEY_LEN * 2 {
        return Err(KeyParseError::InvalidLength {
            expected: KEY_LEN * 2,
            actual: trimmed.len(),
        });
    }
    let mut out = [0u8; KEY_LEN];
    hex::decode_to_slice(trimmed, &mut out)
        .map_err(|e| KeyParseError::InvalidHex(e.to_string()))?;
    Ok(out)
}

fn digest(input: &[u8]) -> [u8; KEY_LEN] {
    Sha256::digest(input).into()
}

macro_rules! opaque_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; KEY_LEN]);

        impl $name {
            /// Wrap raw digest bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
                Self(bytes)
            }

            /// Derive a key as the SHA-256 digest of `input`.
            #[must_use]
            pub fn derive(input: &[u8]) -> Self {
                Self(digest(input))
            }

            /// Parse a key from its hex form.
            ///
            /// # Errors
            /// Returns [`KeyParseError`] if the input is not exactly
            /// `2 * KEY_LEN` hex characters.
            pub fn from_hex(input: &str) -> Result<Self, KeyParseError> {
                decode_key(input).map(Self)
            }

            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
                &self.0
            }

            /// Lowercase hex encoding, used in cache keys and audit records.
            #[must_use]
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl std::str::FromStr for $name {
            type Err = KeyParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::from_hex(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

opaque_key!(
    /// Opaque tenant key. The sole tenant-scoping token used downstream.
    TenantKey
);

opaque_key!(
    /// Opaque user key.
    UserKey
);

opaque_key!(
    /// One-way hash of a raw API key. Stores are queried by this value only.
    KeyHash
);

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let key = TenantKey::derive(b"acme");
        let parsed = TenantKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(parsed, key);
        assert_eq!(key.to_hex().len(), KEY_LEN * 2);
    }

    #[test]
    fn rejects_short_input() {
        let err = UserKey::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            KeyParseError::InvalidLength {
                expected: 64,
                actual: 4
            }
        );
    }

    #[test]
    fn rejects_non_hex_input() {
        let input = "z".repeat(64);
        assert!(matches!(
            KeyHash::from_hex(&input),
            Err(KeyParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn derive_is_deterministic_and_input_sensitive() {
        assert_eq!(TenantKey::derive(b"a"), TenantKey::derive(b"a"));
        assert_ne!(TenantKey::derive(b"a"), TenantKey::derive(b"b"));
    }

    #[test]
    fn debug_names_the_key_type() {
        let key = UserKey::from_bytes([0u8; KEY_LEN]);
        assert!(format!("{key:?}").starts_with("UserKey("));
    }
}
