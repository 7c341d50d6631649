//! Authentication token issued by the SII

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Environment;

/// Token obtained by presenting a signed seed to the SII.
///
/// The SII does not communicate an expiry. A token stays cached until a
/// call made with it is rejected, at which point it is evicted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub environment: Environment,
    pub acquired_at: DateTime<Utc>,
}

impl Token {
    pub fn new(value: impl Into<String>, environment: Environment) -> Self {
        Self { value: value.into(), environment, acquired_at: Utc::now() }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// Opaque identity of an authentication credential.
///
/// Usually the fingerprint or serial of the digital certificate; two
/// credentials with the same identity share cached tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialId(String);

impl CredentialId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of the token for one (credential, environment) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Unauthenticated,
    Authenticating,
    Authenticated,
}
