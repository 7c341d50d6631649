//! Port interfaces for talking to the SII webservices

use async_trait::async_trait;
use dtelink_domain::{AttemptFailure, Endpoint, Result, SoapPayload};
use serde_json::Value;

/// Sends exactly one SOAP request; retries are the executor's job
#[async_trait]
pub trait SoapTransport: Send + Sync {
    /// Post `operation` with `payload` to `endpoint` and return the XML
    /// document carried in the response.
    ///
    /// # Errors
    /// Returns an [`AttemptFailure`] classifying what went wrong so the
    /// caller can decide whether another attempt makes sense.
    async fn call(
        &self,
        endpoint: &Endpoint,
        operation: &str,
        payload: &SoapPayload,
    ) -> std::result::Result<String, AttemptFailure>;
}

/// Converts between XML documents and structured values
pub trait XmlCodec: Send + Sync {
    /// Decode an XML document. The root element becomes the single key of
    /// the returned object.
    fn decode(&self, xml: &str) -> Result<Value>;

    /// Encode a value shaped like the output of [`XmlCodec::decode`].
    fn encode(&self, value: &Value) -> Result<String>;
}
