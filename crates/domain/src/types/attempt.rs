//! Bookkeeping for individual webservice attempts

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Classification of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No response within the configured request timeout
    Timeout,

    /// Connection could not be established or was interrupted
    Transport,

    /// The SII answered with a server-side fault (5xx or SOAP server fault)
    ServerFault,

    /// The credential or token was refused
    AuthRejected,

    /// The SII blamed the request itself (malformed payload, 4xx)
    ClientFault,
}

impl_domain_status_conversions!(FailureKind {
    Timeout => "timeout",
    Transport => "transport",
    ServerFault => "server_fault",
    AuthRejected => "auth_rejected",
    ClientFault => "client_fault",
});

impl FailureKind {
    /// Returns true if another attempt may produce a different result
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport | Self::ServerFault)
    }
}

/// A failed attempt together with the reason reported by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    pub fn server_fault(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ServerFault, message)
    }

    pub fn auth_rejected(message: impl Into<String>) -> Self {
        Self::new(FailureKind::AuthRejected, message)
    }

    pub fn client_fault(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ClientFault, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of one attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Success,
    Failed(AttemptFailure),
}

/// One try of a webservice call, kept for retry bookkeeping and diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAttempt {
    /// 1-based position of the attempt within the call
    pub sequence: u32,
    /// Time waited before this attempt was sent
    pub backoff: Duration,
    pub outcome: AttemptOutcome,
}

impl RequestAttempt {
    pub fn failure(&self) -> Option<&AttemptFailure> {
        match &self.outcome {
            AttemptOutcome::Success => None,
            AttemptOutcome::Failed(failure) => Some(failure),
        }
    }
}
