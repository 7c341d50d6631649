//! Conversions from external infrastructure errors into domain errors.

use dtelink_domain::{AttemptFailure, DteLinkError};
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DteLinkError);

impl From<InfraError> for DteLinkError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DteLinkError> for InfraError {
    fn from(value: DteLinkError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoDteLinkError {
    fn into_dtelink(self) -> DteLinkError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → DteLinkError */
/* -------------------------------------------------------------------------- */

impl IntoDteLinkError for HttpError {
    fn into_dtelink(self) -> DteLinkError {
        // Only client construction turns a reqwest error into a domain error;
        // per-attempt failures go through `attempt_failure`.
        DteLinkError::Config(format!("invalid HTTP client setup: {self}"))
    }
}

/// Classify a failed send so the executor can decide whether to retry.
pub(crate) fn attempt_failure(err: &HttpError) -> AttemptFailure {
    if err.is_timeout() {
        return AttemptFailure::timeout(err.to_string());
    }
    AttemptFailure::transport(err.to_string())
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_dtelink())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → DteLinkError */
/* -------------------------------------------------------------------------- */

impl IntoDteLinkError for std::io::Error {
    fn into_dtelink(self) -> DteLinkError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::PermissionDenied => {
                DteLinkError::Cache(format!("permission denied: {self}"))
            }
            ErrorKind::InvalidData => DteLinkError::Cache(format!("corrupt cache entry: {self}")),
            _ => DteLinkError::Cache(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_dtelink())
    }
}

/* -------------------------------------------------------------------------- */
/* quick_xml::Error → DteLinkError */
/* -------------------------------------------------------------------------- */

impl IntoDteLinkError for quick_xml::Error {
    fn into_dtelink(self) -> DteLinkError {
        DteLinkError::Codec(format!("malformed XML: {self}"))
    }
}

impl From<quick_xml::Error> for InfraError {
    fn from(value: quick_xml::Error) -> Self {
        InfraError(value.into_dtelink())
    }
}

impl From<quick_xml::escape::EscapeError> for InfraError {
    fn from(value: quick_xml::escape::EscapeError) -> Self {
        InfraError(quick_xml::Error::from(value).into_dtelink())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
