//! Domain types and models

pub mod attempt;
pub mod environment;
pub mod payload;
pub mod response;
pub mod signature;
pub mod token;

pub use attempt::{AttemptFailure, AttemptOutcome, FailureKind, RequestAttempt};
pub use environment::Environment;
pub use payload::{Endpoint, RawResponse, SoapPayload, WebserviceResponse};
pub use response::{body_field, find_key, ResponseHeader};
pub use signature::{DocumentSignatureQuery, SignatureStatus, SignatureVerdict};
pub use token::{CredentialId, Token, TokenState};
