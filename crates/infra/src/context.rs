//! Service context - wires the adapters into the core services

use std::sync::Arc;

use dtelink_core::{RequestExecutor, SignatureValidator, SoapTransport, TokenCache, TokenManager};
use dtelink_domain::{ConnectionOptions, Result};

use crate::cache::build_token_cache;
use crate::http::HttpSoapTransport;
use crate::xml::QuickXmlCodec;

/// Holds the services for one connection profile
///
/// Tokens are shared by every service built from the same context.
pub struct SiiContext {
    pub options: Arc<ConnectionOptions>,
    pub tokens: Arc<TokenManager>,
    pub signatures: SignatureValidator,
}

impl SiiContext {
    /// Build the context with the HTTP transport and the configured cache.
    ///
    /// # Errors
    /// Returns `DteLinkError::Config` if the HTTP client cannot be built.
    pub fn new(options: ConnectionOptions) -> Result<Self> {
        let transport = Arc::new(HttpSoapTransport::from_options(&options)?);
        let cache = build_token_cache(&options);
        Ok(Self::with_adapters(options, transport, cache))
    }

    /// Build the context over caller-supplied transport and cache.
    pub fn with_adapters(
        options: ConnectionOptions,
        transport: Arc<dyn SoapTransport>,
        cache: Arc<dyn TokenCache>,
    ) -> Self {
        let options = Arc::new(options);
        let codec = Arc::new(QuickXmlCodec::new());
        let executor = RequestExecutor::from_options(transport, &options);

        let tokens = Arc::new(TokenManager::new(
            options.clone(),
            executor.clone(),
            codec.clone(),
            cache,
        ));
        let signatures = SignatureValidator::new(options.clone(), tokens.clone(), executor, codec);

        tracing::debug!(
            environment = %options.environment(),
            retry_budget = options.retry_budget(),
            "SII context ready"
        );

        Self { options, tokens, signatures }
    }
}
