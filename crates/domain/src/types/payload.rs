//! Request and response values exchanged with the SII webservices

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::RequestAttempt;

/// Fully resolved location of one webservice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Service name, e.g. `QueryEstDteAv`
    pub service: String,
    /// URL of the service description
    pub wsdl: String,
    /// URL the SOAP request is posted to (the WSDL URL without its query)
    pub address: String,
    /// Local copy of the service description, when one is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_wsdl: Option<PathBuf>,
}

impl Endpoint {
    pub fn from_wsdl(service: impl Into<String>, wsdl: impl Into<String>) -> Self {
        let wsdl = wsdl.into();
        let address = match wsdl.split_once('?') {
            Some((address, _)) => address.to_string(),
            None => wsdl.clone(),
        };
        Self { service: service.into(), wsdl, address, local_wsdl: None }
    }

    pub fn with_local_wsdl(mut self, path: Option<PathBuf>) -> Self {
        self.local_wsdl = path;
        self
    }
}

/// Ordered arguments of a webservice operation
///
/// Order is preserved because the SII's RPC-style services bind arguments
/// by position as well as by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapPayload {
    arguments: Vec<(String, String)>,
}

impl SoapPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument, replacing any previous value with the same name.
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        let name = name.into();
        let value = value.to_string();
        match self.arguments.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.arguments.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.arguments.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.arguments.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.arguments.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }
}

/// Raw XML returned by a successful call plus the attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub body: String,
    pub attempts: Vec<RequestAttempt>,
}

impl RawResponse {
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }
}

/// Decoded response paired with the exact payload that produced it
///
/// Keeping both together lets a failure be diagnosed against what was
/// actually sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebserviceResponse<T> {
    /// Typed interpretation of the response
    pub outcome: T,
    /// Decoded response structure
    pub data: serde_json::Value,
    /// Arguments sent to the webservice
    pub request: SoapPayload,
}
