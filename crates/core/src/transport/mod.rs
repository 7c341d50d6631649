//! Resilient webservice calls
//!
//! [`RequestExecutor`] wraps a [`SoapTransport`] with the bounded
//! exponential backoff policy shared by every SII operation.

pub mod executor;
pub mod ports;

pub use executor::{RequestExecutor, RetryPolicy};
pub use ports::{SoapTransport, XmlCodec};
