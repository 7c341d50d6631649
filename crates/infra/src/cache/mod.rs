//! Token cache backends
//!
//! Both backends store the serialized token under the key chosen by the
//! `TokenManager`; they never interpret the value.

pub mod filesystem;
pub mod memory;

use std::sync::Arc;

use dtelink_core::TokenCache;
use dtelink_domain::{CacheBackend, ConnectionOptions};
use tracing::debug;

pub use filesystem::FilesystemTokenCache;
pub use memory::MemoryTokenCache;

/// Cache backend selected by `options.cache_backend()`.
pub fn build_token_cache(options: &ConnectionOptions) -> Arc<dyn TokenCache> {
    match options.cache_backend() {
        CacheBackend::Memory => {
            debug!("using in-memory token cache");
            Arc::new(MemoryTokenCache::new())
        }
        CacheBackend::Filesystem => {
            let cache = match options.cache_dir() {
                Some(dir) => FilesystemTokenCache::new(dir),
                None => FilesystemTokenCache::in_temp_dir(),
            };
            debug!(dir = %cache.dir().display(), "using filesystem token cache");
            Arc::new(cache)
        }
    }
}
