use std::time::Duration;

use async_trait::async_trait;
use dtelink_core::SoapTransport;
use dtelink_domain::constants::DEFAULT_REQUEST_TIMEOUT;
use dtelink_domain::{AttemptFailure, ConnectionOptions, DteLinkError, Endpoint, SoapPayload};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, StatusCode};
use tracing::{debug, warn};

use crate::errors::{attempt_failure, InfraError};

const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP 1.1 client for the SII webservices.
///
/// One attempt per [`SoapTransport::call`]; retries belong to the
/// `RequestExecutor`, which reads the [`AttemptFailure`] classification.
#[derive(Clone)]
pub struct HttpSoapTransport {
    client: ReqwestClient,
}

impl HttpSoapTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpSoapTransportBuilder {
        HttpSoapTransportBuilder::default()
    }

    /// Transport configured from the timeout and TLS settings of `options`.
    pub fn from_options(options: &ConnectionOptions) -> Result<Self, DteLinkError> {
        Self::builder()
            .timeout(options.request_timeout())
            .verify_tls(options.verify_tls())
            .build()
    }

    async fn post(
        &self,
        endpoint: &Endpoint,
        operation: &str,
        payload: &SoapPayload,
    ) -> Result<(StatusCode, String), AttemptFailure> {
        let envelope = build_envelope(operation, payload);
        let address = local_address(endpoint).await;

        let response = self
            .client
            .post(address.as_deref().unwrap_or(&endpoint.address))
            .header("SOAPAction", "\"\"")
            .body(envelope)
            .send()
            .await
            .map_err(|err| attempt_failure(&err))?;

        let status = response.status();
        let body = response.text().await.map_err(|err| attempt_failure(&err))?;
        Ok((status, body))
    }
}

#[async_trait]
impl SoapTransport for HttpSoapTransport {
    async fn call(
        &self,
        endpoint: &Endpoint,
        operation: &str,
        payload: &SoapPayload,
    ) -> Result<String, AttemptFailure> {
        let (status, body) = self.post(endpoint, operation, payload).await?;
        debug!(service = %endpoint.service, operation, %status, "received SOAP response");

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(AttemptFailure::auth_rejected(format!("HTTP {status}")));
        }

        let scanned = match scan_response(&body) {
            Ok(scanned) => scanned,
            Err(err) if status.is_success() => {
                let err = DteLinkError::from(err);
                return Err(AttemptFailure::server_fault(format!("unreadable SOAP response: {err}")));
            }
            Err(_) => ScannedResponse::default(),
        };

        if let Some(fault) = scanned.fault {
            return Err(fault.into_failure());
        }

        if status.is_server_error() {
            return Err(AttemptFailure::server_fault(format!("HTTP {status}")));
        }
        if status.is_client_error() {
            return Err(AttemptFailure::client_fault(format!("HTTP {status}")));
        }

        scanned.result.ok_or_else(|| {
            AttemptFailure::server_fault(format!("SOAP response has no {operation} result"))
        })
    }
}

/// Builder for [`HttpSoapTransport`].
#[derive(Debug)]
pub struct HttpSoapTransportBuilder {
    timeout: Duration,
    verify_tls: bool,
    user_agent: Option<String>,
}

impl Default for HttpSoapTransportBuilder {
    fn default() -> Self {
        Self { timeout: DEFAULT_REQUEST_TIMEOUT, verify_tls: true, user_agent: None }
    }
}

impl HttpSoapTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Accept any server certificate when `false`. Only for test setups.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpSoapTransport, DteLinkError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/xml; charset=utf-8"));

        let mut builder =
            ReqwestClient::builder().timeout(self.timeout).default_headers(headers).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if !self.verify_tls {
            warn!("TLS certificate verification disabled for SII requests");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|err| {
            let infra: InfraError = err.into();
            DteLinkError::from(infra)
        })?;

        Ok(HttpSoapTransport { client })
    }
}

/// SOAP address declared by the endpoint's local WSDL copy, if it has one.
///
/// An unreadable copy is logged and the templated address is used instead.
async fn local_address(endpoint: &Endpoint) -> Option<String> {
    let path = endpoint.local_wsdl.as_ref()?;
    let document = match tokio::fs::read_to_string(path).await {
        Ok(document) => document,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read local WSDL");
            return None;
        }
    };
    match soap_address(&document) {
        Ok(address) => address,
        Err(err) => {
            let err = DteLinkError::from(err);
            warn!(path = %path.display(), error = %err, "could not parse local WSDL");
            None
        }
    }
}

/// `location` of the first `soap:address` element in a WSDL document.
fn soap_address(wsdl: &str) -> Result<Option<String>, InfraError> {
    let mut reader = Reader::from_str(wsdl);

    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"address" =>
            {
                let location =
                    element.try_get_attribute("location").map_err(quick_xml::Error::from)?;
                if let Some(location) = location {
                    return Ok(Some(location.unescape_value()?.into_owned()));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// RPC-style SOAP 1.1 envelope with one child element per argument.
fn build_envelope(operation: &str, payload: &SoapPayload) -> String {
    let mut arguments = String::new();
    for (name, value) in payload.iter() {
        arguments.push_str(&format!("<{name}>{}</{name}>", escape(value)));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <soapenv:Envelope xmlns:soapenv=\"{SOAP_ENVELOPE_NS}\">\
         <soapenv:Body><{operation}>{arguments}</{operation}></soapenv:Body>\
         </soapenv:Envelope>"
    )
}

#[derive(Debug, Default)]
struct ScannedResponse {
    /// Text of the `...Return` element
    result: Option<String>,
    fault: Option<SoapFault>,
}

#[derive(Debug, Default)]
struct SoapFault {
    code: String,
    message: String,
}

impl SoapFault {
    fn into_failure(self) -> AttemptFailure {
        let message = format!("SOAP fault {}: {}", self.code, self.message);
        let local_code = self.code.rsplit(':').next().unwrap_or_default();
        if local_code.starts_with("Client") {
            AttemptFailure::client_fault(message)
        } else {
            AttemptFailure::server_fault(message)
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Capture {
    None,
    Result,
    FaultCode,
    FaultString,
}

fn scan_response(body: &str) -> Result<ScannedResponse, InfraError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut scanned = ScannedResponse::default();
    let mut capture = Capture::None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                let name = element.local_name();
                let name = name.as_ref();
                capture = if name == b"Fault" {
                    scanned.fault.get_or_insert_with(SoapFault::default);
                    Capture::None
                } else if name == b"faultcode" {
                    Capture::FaultCode
                } else if name == b"faultstring" {
                    Capture::FaultString
                } else if name.ends_with(b"Return") && scanned.result.is_none() {
                    Capture::Result
                } else {
                    capture
                };
                text.clear();
            }
            Event::Empty(element) => {
                if element.local_name().as_ref().ends_with(b"Return") && scanned.result.is_none() {
                    scanned.result = Some(String::new());
                }
            }
            Event::Text(content) if capture != Capture::None => {
                text.push_str(&content.unescape()?);
            }
            Event::CData(content) if capture != Capture::None => {
                text.push_str(&String::from_utf8_lossy(&content.into_inner()));
            }
            Event::End(_) => {
                match capture {
                    Capture::Result => scanned.result = Some(std::mem::take(&mut text)),
                    Capture::FaultCode => {
                        scanned.fault.get_or_insert_with(SoapFault::default).code =
                            std::mem::take(&mut text);
                    }
                    Capture::FaultString => {
                        scanned.fault.get_or_insert_with(SoapFault::default).message =
                            std::mem::take(&mut text);
                    }
                    Capture::None => {}
                }
                capture = Capture::None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(scanned)
}
