//! Token manager with reactive invalidation
//!
//! Manages the SII token lifecycle per (credential, environment):
//! - Cache lookup keyed by credential identity and environment
//! - Seed request, challenge signing and token exchange on a miss
//! - At most one authentication in flight per key
//! - Eviction when a consumer reports the token was rejected
//!
//! The SII does not publish token lifetimes, so there is no expiry check;
//! a token is used until a call made with it fails authentication.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use dtelink_domain::constants::{
    SEED_OPERATION, SEED_SERVICE, STATUS_OK, TOKEN_ARGUMENT, TOKEN_OPERATION, TOKEN_SERVICE,
};
use dtelink_domain::{
    body_field, ConnectionOptions, DteLinkError, ResponseHeader, Result, SoapPayload, Token,
    TokenState,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ports::{AuthCredential, TokenCache};
use crate::transport::{RequestExecutor, XmlCodec};

/// Obtains, caches and invalidates SII tokens
pub struct TokenManager {
    options: Arc<ConnectionOptions>,
    executor: RequestExecutor,
    codec: Arc<dyn XmlCodec>,
    cache: Arc<dyn TokenCache>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    authenticating: DashSet<String>,
}

impl TokenManager {
    pub fn new(
        options: Arc<ConnectionOptions>,
        executor: RequestExecutor,
        codec: Arc<dyn XmlCodec>,
        cache: Arc<dyn TokenCache>,
    ) -> Self {
        Self {
            options,
            executor,
            codec,
            cache,
            in_flight: DashMap::new(),
            authenticating: DashSet::new(),
        }
    }

    /// Cache key for `credential` in the configured environment.
    pub fn cache_key(&self, credential: &dyn AuthCredential) -> String {
        format!("dtelink:token:{}:{}", self.options.environment(), credential.identity())
    }

    /// Return the cached token for `credential`, authenticating on a miss.
    ///
    /// Concurrent callers for the same key wait for a single authentication
    /// and then read its result from the cache.
    ///
    /// # Errors
    /// - `DteLinkError::Auth` if signing fails or the SII refuses the seed or
    ///   token request; nothing is cached in that case
    /// - `DteLinkError::ServiceUnavailable` if the SII could not be reached
    ///   within the retry budget
    pub async fn get_token(&self, credential: &dyn AuthCredential) -> Result<Token> {
        let key = self.cache_key(credential);

        if let Some(token) = self.cached(&key).await? {
            debug!(key = %key, "token cache hit");
            return Ok(token);
        }

        let lock = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;

            // Another caller may have finished authenticating while we waited.
            match self.cached(&key).await? {
                Some(token) => {
                    debug!(key = %key, "token obtained by concurrent request");
                    Ok(token)
                }
                None => self.authenticate_and_store(&key, credential).await,
            }
        };

        drop(lock);
        self.in_flight.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Evict the cached token for `credential`.
    ///
    /// Called by consumers whose request was rejected with a cached token.
    /// The next [`TokenManager::get_token`] authenticates again.
    pub async fn invalidate(&self, credential: &dyn AuthCredential) -> Result<()> {
        let key = self.cache_key(credential);
        self.cache.delete(&key).await?;
        warn!(
            key = %key,
            environment = %self.options.environment(),
            "token invalidated"
        );
        Ok(())
    }

    /// Evict `rejected` if it is still the cached token for `credential`.
    ///
    /// A newer token obtained by another task since `rejected` was handed
    /// out stays cached.
    pub async fn invalidate_rejected(
        &self,
        credential: &dyn AuthCredential,
        rejected: &Token,
    ) -> Result<()> {
        let key = self.cache_key(credential);
        match self.cached(&key).await? {
            Some(current) if current.value == rejected.value => self.invalidate(credential).await,
            Some(_) => {
                debug!(key = %key, "rejected token already replaced, keeping the newer one");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Where the token for `credential` currently is in its lifecycle.
    pub async fn state(&self, credential: &dyn AuthCredential) -> Result<TokenState> {
        let key = self.cache_key(credential);
        if self.authenticating.contains(&key) {
            return Ok(TokenState::Authenticating);
        }
        Ok(match self.cached(&key).await? {
            Some(_) => TokenState::Authenticated,
            None => TokenState::Unauthenticated,
        })
    }

    async fn cached(&self, key: &str) -> Result<Option<Token>> {
        let Some(raw) = self.cache.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<Token>(&raw) {
            Ok(token) if token.environment == self.options.environment() => Ok(Some(token)),
            Ok(_) => Ok(None),
            Err(err) => {
                warn!(key = %key, error = %err, "discarding unreadable cached token");
                self.cache.delete(key).await?;
                Ok(None)
            }
        }
    }

    async fn authenticate_and_store(
        &self,
        key: &str,
        credential: &dyn AuthCredential,
    ) -> Result<Token> {
        let _authenticating = AuthenticatingGuard::new(&self.authenticating, key);

        let token = self.authenticate(credential).await?;
        let serialized = serde_json::to_string(&token)
            .map_err(|e| DteLinkError::Internal(format!("Failed to serialize token: {e}")))?;
        self.cache.set(key, serialized).await?;

        info!(
            key = %key,
            environment = %token.environment,
            "obtained new SII token"
        );
        Ok(token)
    }

    async fn authenticate(&self, credential: &dyn AuthCredential) -> Result<Token> {
        let seed = self.request_seed().await?;

        let signed = credential.sign(&seed_challenge(&seed)).map_err(|err| match err {
            DteLinkError::Auth(_) => err,
            other => DteLinkError::Auth(format!("Failed to sign the SII seed: {other}")),
        })?;

        let endpoint = self.options.resolve_endpoint(TOKEN_SERVICE);
        let payload = SoapPayload::new().with(TOKEN_ARGUMENT, signed);
        let response = self.executor.send(&endpoint, TOKEN_OPERATION, &payload).await?;

        let value = self.codec.decode(&response.body)?;
        let header = ResponseHeader::from_value(&value)?;
        if header.status != STATUS_OK {
            return Err(DteLinkError::Auth(format!(
                "SII refused the token request: {}",
                header.summary()
            )));
        }

        let token = body_field(&value, "TOKEN")
            .filter(|token| !token.is_empty())
            .ok_or_else(|| DteLinkError::Auth("SII token response has no TOKEN".into()))?;

        Ok(Token::new(token, self.options.environment()))
    }

    async fn request_seed(&self) -> Result<String> {
        let endpoint = self.options.resolve_endpoint(SEED_SERVICE);
        let response = self.executor.send(&endpoint, SEED_OPERATION, &SoapPayload::new()).await?;

        let value = self.codec.decode(&response.body)?;
        let header = ResponseHeader::from_value(&value)?;
        if header.status != STATUS_OK {
            return Err(DteLinkError::Auth(format!(
                "SII refused the seed request: {}",
                header.summary()
            )));
        }

        body_field(&value, "SEMILLA")
            .filter(|seed| !seed.is_empty())
            .ok_or_else(|| DteLinkError::Auth("SII seed response has no SEMILLA".into()))
    }
}

/// Document the credential signs to exchange a seed for a token.
pub fn seed_challenge(seed: &str) -> String {
    format!("<getToken><item><Semilla>{seed}</Semilla></item></getToken>")
}

/// Marks a key as authenticating for as long as it is alive.
struct AuthenticatingGuard<'a> {
    set: &'a DashSet<String>,
    key: String,
}

impl<'a> AuthenticatingGuard<'a> {
    fn new(set: &'a DashSet<String>, key: &str) -> Self {
        set.insert(key.to_string());
        Self { set, key: key.to_string() }
    }
}

impl Drop for AuthenticatingGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}
