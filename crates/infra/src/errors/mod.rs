//! Infrastructure error conversions

mod conversions;

pub(crate) use conversions::attempt_failure;
pub use conversions::InfraError;
