//! Token lifecycle for SII authentication
//!
//! - [`AuthCredential`]: signs the seed challenge
//! - [`TokenCache`]: pluggable storage for issued tokens
//! - [`TokenManager`]: seed/token flow, caching and single-flight acquisition

pub mod ports;
pub mod token_manager;

pub use ports::{AuthCredential, TokenCache};
pub use token_manager::TokenManager;
