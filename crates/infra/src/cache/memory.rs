//! In-process token cache with moka

use async_trait::async_trait;
use dtelink_core::TokenCache;
use dtelink_domain::Result;
use moka::future::Cache;

/// Default max capacity (one entry per credential and environment)
pub const DEFAULT_TOKEN_CACHE_CAPACITY: u64 = 1000;

/// Token cache living as long as the process
///
/// Entries have no TTL; tokens leave the cache when they are invalidated.
#[derive(Clone)]
pub struct MemoryTokenCache {
    entries: Cache<String, String>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOKEN_CACHE_CAPACITY)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        Self { entries: Cache::builder().max_capacity(max_capacity).build() }
    }
}

impl Default for MemoryTokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).await)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }
}
