//! Helpers for the `RESPUESTA` documents returned by the SII services
//!
//! Every SII service answers with an XML document holding a `RESP_HDR`
//! (status and messages) and an optional `RESP_BODY`. The XML codec turns it
//! into a `serde_json::Value`; these helpers read it back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{DteLinkError, Result};

/// Status block of an SII response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// `ESTADO`
    pub status: String,
    /// `GLOSA`
    pub description: Option<String>,
    /// `ERR_CODE`
    pub error_code: Option<String>,
    /// `GLOSA_ERR`
    pub error_description: Option<String>,
    /// `NUM_ATENCION`
    pub tracking_number: Option<String>,
}

impl ResponseHeader {
    /// Read the header out of a decoded response.
    ///
    /// # Errors
    /// Returns `DteLinkError::Codec` when the document has no `RESP_HDR` or
    /// the header has no `ESTADO`.
    pub fn from_value(value: &Value) -> Result<Self> {
        let header = find_key(value, "RESP_HDR")
            .ok_or_else(|| DteLinkError::Codec("response has no RESP_HDR".into()))?;
        let status = text_field(header, "ESTADO")
            .ok_or_else(|| DteLinkError::Codec("response header has no ESTADO".into()))?;

        Ok(Self {
            status,
            description: text_field(header, "GLOSA"),
            error_code: text_field(header, "ERR_CODE"),
            error_description: text_field(header, "GLOSA_ERR"),
            tracking_number: text_field(header, "NUM_ATENCION"),
        })
    }

    /// Human-readable message for logs and errors.
    pub fn summary(&self) -> String {
        match (&self.description, &self.error_description) {
            (Some(desc), Some(err)) => format!("{} ({desc}; {err})", self.status),
            (Some(desc), None) | (None, Some(desc)) => format!("{} ({desc})", self.status),
            (None, None) => self.status.clone(),
        }
    }
}

/// Read a text element from the `RESP_BODY` of a decoded response.
pub fn body_field(value: &Value, name: &str) -> Option<String> {
    find_key(value, "RESP_BODY").and_then(|body| text_field(body, name))
}

/// Depth-first lookup of the first object member named `key`.
pub fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key) {
                return Some(found);
            }
            map.values().find_map(|child| find_key(child, key))
        }
        Value::Array(items) => items.iter().find_map(|child| find_key(child, key)),
        _ => None,
    }
}

fn text_field(value: &Value, name: &str) -> Option<String> {
    match value.get(name)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
