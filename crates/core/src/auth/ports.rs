//! Port interfaces for authentication against the SII

use async_trait::async_trait;
use dtelink_domain::{CredentialId, Result};

/// Something that can sign an authentication challenge
///
/// Backed by a digital certificate in practice. The key material never
/// leaves the implementation; the token manager only sees the identity and
/// the signed document.
pub trait AuthCredential: Send + Sync {
    /// Stable identity used to key cached tokens.
    fn identity(&self) -> CredentialId;

    /// Sign `challenge` (an XML document) and return the signed document.
    ///
    /// # Errors
    /// Any error is reported to the caller as an authentication error.
    fn sign(&self, challenge: &str) -> Result<String>;
}

/// Key/value store for serialized tokens
#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
