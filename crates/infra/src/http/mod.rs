//! HTTP transport for the SII SOAP services

pub mod soap;

pub use soap::{HttpSoapTransport, HttpSoapTransportBuilder};
