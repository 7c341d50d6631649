//! Mock port implementations

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dtelink_core::{AuthCredential, SoapTransport, TokenCache, XmlCodec};
use dtelink_domain::{
    AttemptFailure, CredentialId, DteLinkError, Endpoint, Result, SoapPayload,
};
use serde_json::Value;

type Scripted = std::result::Result<String, AttemptFailure>;

/// Decodes JSON in place of XML.
pub struct JsonCodec;

impl XmlCodec for JsonCodec {
    fn decode(&self, xml: &str) -> Result<Value> {
        serde_json::from_str(xml).map_err(|e| DteLinkError::Codec(e.to_string()))
    }

    fn encode(&self, value: &Value) -> Result<String> {
        Ok(value.to_string())
    }
}

/// Transport answering per service from a script; the last scripted result
/// of a service repeats forever.
#[derive(Default)]
pub struct RoutingTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(String, String, SoapPayload)>>,
    latency: Option<Duration>,
}

impl RoutingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that already answers the seed and token services.
    pub fn authenticating(token: &str) -> Self {
        Self::new()
            .respond("CrSeed", Ok(super::seed_ok()))
            .respond("GetTokenFromSeed", Ok(super::token_ok(token)))
    }

    pub fn respond(self, service: &str, result: Scripted) -> Self {
        self.scripts.lock().unwrap().entry(service.to_string()).or_default().push_back(result);
        self
    }

    /// Delay every call, to widen race windows in concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls_to(&self, service: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(s, _, _)| s == service).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_payload(&self, service: &str) -> Option<SoapPayload> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _, _)| s == service)
            .map(|(_, _, payload)| payload.clone())
    }

    pub fn last_operation(&self, service: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _, _)| s == service)
            .map(|(_, operation, _)| operation.clone())
    }
}

#[async_trait]
impl SoapTransport for RoutingTransport {
    async fn call(
        &self,
        endpoint: &Endpoint,
        operation: &str,
        payload: &SoapPayload,
    ) -> std::result::Result<String, AttemptFailure> {
        self.calls.lock().unwrap().push((
            endpoint.service.clone(),
            operation.to_string(),
            payload.clone(),
        ));
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut scripts = self.scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(&endpoint.service) else {
            return Err(AttemptFailure::client_fault(format!("no script for {}", endpoint.service)));
        };
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        }
    }
}

/// In-memory token cache with operation counters.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    pub sets: AtomicUsize,
    pub deletes: AtomicUsize,
    /// Make every `delete` fail, as a full or read-only disk would.
    pub fail_deletes: AtomicBool,
}

impl MemoryCache {
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(DteLinkError::Cache("disk full".into()));
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Credential that "signs" by wrapping the challenge.
pub struct FakeCredential {
    id: String,
    fail: bool,
    pub signatures: AtomicUsize,
}

impl FakeCredential {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string(), fail: false, signatures: AtomicUsize::new(0) }
    }

    /// Credential whose key material is unusable.
    pub fn broken(id: &str) -> Self {
        Self { id: id.to_string(), fail: true, signatures: AtomicUsize::new(0) }
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.load(Ordering::SeqCst)
    }
}

impl AuthCredential for FakeCredential {
    fn identity(&self) -> CredentialId {
        CredentialId::new(self.id.clone())
    }

    fn sign(&self, challenge: &str) -> Result<String> {
        self.signatures.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DteLinkError::Internal("private key does not match certificate".into()));
        }
        Ok(format!("<signed by=\"{}\">{challenge}</signed>", self.id))
    }
}
