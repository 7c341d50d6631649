//! Error types used throughout the integration

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::AttemptFailure;

/// Main error type for DteLink
///
/// Variants mirror how a caller has to react: validation and authentication
/// errors are final, `ServiceUnavailable` is what remains after the retry
/// budget was spent, and `Rejected` is a fault the remote side blamed on the
/// request itself.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum DteLinkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Request rejected by {operation}: {message}")]
    Rejected { operation: String, message: String },

    #[error(
        "Service {service} unavailable: {operation} failed after {attempts} attempts ({last_failure})"
    )]
    ServiceUnavailable {
        service: String,
        operation: String,
        attempts: u32,
        last_failure: AttemptFailure,
    },

    #[error(
        "Could not validate the signature of document T{document_type}F{folio} issued by {issuer}: {source}"
    )]
    SignatureValidation {
        document_type: u16,
        folio: u64,
        issuer: String,
        source: Box<DteLinkError>,
    },

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DteLinkError {
    /// Build a validation error for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// True when the remote authority refused the credential or token.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Auth(_) => true,
            Self::SignatureValidation { source, .. } => source.is_auth(),
            _ => false,
        }
    }

    /// True when a later identical call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ServiceUnavailable { .. } => true,
            Self::SignatureValidation { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for DteLink operations
pub type Result<T> = std::result::Result<T, DteLinkError>;
