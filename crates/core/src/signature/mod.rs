//! Representative SII workflow: document signature validation

pub mod service;

pub use service::{SignatureValidationResponse, SignatureValidator};
