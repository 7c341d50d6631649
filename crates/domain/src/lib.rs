//! # DteLink Domain
//!
//! Business domain types for the SII webservice integration.
//!
//! This crate contains:
//! - Connection configuration and endpoint resolution (`ConnectionOptions`)
//! - Tokens, request payloads, attempts and responses
//! - Tax identifier (RUT) and issue date validation
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other DteLink crates
//! - Only external dependencies allowed
//! - Pure data and derivation logic, no I/O besides the local WSDL lookup

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::date::{parse_issue_date, to_authority_date};
pub use utils::rut::Rut;
