//! # DteLink Core
//!
//! Integration logic for the SII webservices - no HTTP or storage code.
//!
//! This crate contains:
//! - Port interfaces (transport, XML codec, credential, token cache)
//! - The retrying request executor
//! - The token manager
//! - The signature validation workflow
//!
//! ## Architecture Principles
//! - Only depends on `dtelink-domain`
//! - All I/O goes through traits implemented in `dtelink-infra`
//! - Pure, testable orchestration

pub mod auth;
pub mod signature;
pub mod transport;

pub use auth::{AuthCredential, TokenCache, TokenManager};
pub use signature::{SignatureValidationResponse, SignatureValidator};
pub use transport::{RequestExecutor, RetryPolicy, SoapTransport, XmlCodec};
