//! Shared test helpers for `dtelink-core` integration tests.
//!
//! The mocks speak JSON instead of XML: `JsonCodec` stands in for the XML
//! codec, so scripted transport responses are JSON documents shaped like a
//! decoded `RESPUESTA`.

#![allow(dead_code)]

pub mod mocks;

use std::sync::Arc;
use std::time::Duration;

use dtelink_core::{RequestExecutor, RetryPolicy, SignatureValidator, TokenManager};
use dtelink_domain::{ConnectionOptions, Environment};
use serde_json::json;

use mocks::{JsonCodec, MemoryCache, RoutingTransport};

/// Route `tracing` output to the test harness; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Seed response with status `00`.
pub fn seed_ok() -> String {
    json!({
        "RESPUESTA": {
            "RESP_BODY": { "SEMILLA": "012345678901" },
            "RESP_HDR": { "ESTADO": "00" }
        }
    })
    .to_string()
}

/// Token response with status `00` carrying `token`.
pub fn token_ok(token: &str) -> String {
    json!({
        "RESPUESTA": {
            "RESP_BODY": { "TOKEN": token },
            "RESP_HDR": { "ESTADO": "00", "GLOSA": "Token Creado" }
        }
    })
    .to_string()
}

/// Token response refusing the signed seed.
pub fn token_refused() -> String {
    json!({
        "RESPUESTA": {
            "RESP_HDR": { "ESTADO": "-07", "GLOSA": "Error : RUT no validado" }
        }
    })
    .to_string()
}

/// Signature query response with the given header status.
pub fn signature_status(status: &str) -> String {
    json!({
        "RESPUESTA": {
            "RESP_HDR": {
                "ESTADO": status,
                "GLOSA": "Documento Recibido por el SII. Datos Coinciden",
                "NUM_ATENCION": "1234 ( 2024/05/01 10:00:00)"
            }
        }
    })
    .to_string()
}

/// Fully wired services over the given mocks.
pub struct Harness {
    pub options: Arc<ConnectionOptions>,
    pub transport: Arc<RoutingTransport>,
    pub cache: Arc<MemoryCache>,
    pub tokens: Arc<TokenManager>,
    pub validator: SignatureValidator,
}

impl Harness {
    pub fn new(transport: RoutingTransport) -> Self {
        Self::with_options(transport, ConnectionOptions::for_environment(Environment::Certification))
    }

    pub fn with_options(transport: RoutingTransport, options: ConnectionOptions) -> Self {
        init_tracing();
        let options = Arc::new(options);
        let transport = Arc::new(transport);
        let cache = Arc::new(MemoryCache::default());
        let codec = Arc::new(JsonCodec);
        let executor = RequestExecutor::new(
            transport.clone(),
            RetryPolicy::new(options.retry_budget(), Duration::from_millis(10)),
        );
        let tokens = Arc::new(TokenManager::new(
            options.clone(),
            executor.clone(),
            codec.clone(),
            cache.clone(),
        ));
        let validator = SignatureValidator::new(options.clone(), tokens.clone(), executor, codec);

        Self { options, transport, cache, tokens, validator }
    }
}
