//! Token cache persisted as files
//!
//! One JSON file per key, named by the SHA-256 of the key, so tokens survive
//! process restarts and can be shared by processes on the same host.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dtelink_core::TokenCache;
use dtelink_domain::{DteLinkError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Directory name used under the OS temp dir when none is configured
pub const DEFAULT_CACHE_DIR_NAME: &str = "dtelink";

#[derive(Serialize, Deserialize)]
struct Entry {
    key: String,
    value: String,
}

/// Token cache storing one file per key
#[derive(Debug, Clone)]
pub struct FilesystemTokenCache {
    dir: PathBuf,
}

impl FilesystemTokenCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache under `<temp dir>/dtelink`.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }
}

fn io_error(err: std::io::Error) -> DteLinkError {
    InfraError::from(err).into()
}

#[async_trait]
impl TokenCache for FilesystemTokenCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(err)),
        };

        match serde_json::from_str::<Entry>(&contents) {
            Ok(entry) if entry.key == key => Ok(Some(entry.value)),
            Ok(_) => Ok(None),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring corrupt token cache file");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_error)?;

        let entry = Entry { key: key.to_string(), value };
        let contents = serde_json::to_string(&entry)
            .map_err(|e| DteLinkError::Cache(format!("Failed to serialize cache entry: {e}")))?;

        // Write then rename so readers never see a partial file.
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, contents).await.map_err(io_error)?;
        tokio::fs::rename(&staging, &path).await.map_err(io_error)?;

        debug!(path = %path.display(), "token cache entry written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_one_file_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemTokenCache::new(dir.path().join("tokens"));

        cache.set("dtelink:token:production:a", "A".into()).await.unwrap();
        cache.set("dtelink:token:certification:a", "B".into()).await.unwrap();

        assert_eq!(cache.get("dtelink:token:production:a").await.unwrap().as_deref(), Some("A"));
        assert_eq!(cache.get("dtelink:token:certification:a").await.unwrap().as_deref(), Some("B"));
        assert_eq!(std::fs::read_dir(cache.dir()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn file_names_do_not_leak_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemTokenCache::new(dir.path());

        cache.set("dtelink:token:production:76192083-9", "A".into()).await.unwrap();

        let name = std::fs::read_dir(dir.path()).unwrap().next().unwrap().unwrap().file_name();
        let name = name.to_string_lossy();
        assert_eq!(name.len(), 64 + ".json".len());
        assert!(!name.contains("76192083"));
    }

    #[tokio::test]
    async fn survives_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        FilesystemTokenCache::new(dir.path()).set("k", "v".into()).await.unwrap();

        let reopened = FilesystemTokenCache::new(dir.path());

        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn delete_removes_the_file_and_tolerates_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemTokenCache::new(dir.path());
        cache.set("k", "v".into()).await.unwrap();

        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemTokenCache::new(dir.path());
        std::fs::write(cache.path_for("k"), "{ not json").unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_directory_reads_as_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FilesystemTokenCache::new(dir.path().join("never-created"));

        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
