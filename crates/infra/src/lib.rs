//! # DteLink Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - SOAP-over-HTTP transport (reqwest)
//! - XML codec (quick-xml)
//! - Token caches (moka, filesystem)
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `dtelink-core`
//! - Contains all "impure" code (network and file I/O)

pub mod cache;
pub mod config;
pub mod context;
pub mod errors;
pub mod http;
pub mod xml;

// Re-export commonly used items
pub use cache::{build_token_cache, FilesystemTokenCache, MemoryTokenCache};
pub use context::SiiContext;
pub use errors::InfraError;
pub use http::{HttpSoapTransport, HttpSoapTransportBuilder};
pub use xml::QuickXmlCodec;
