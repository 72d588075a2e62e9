//! Artifact store abstraction.
//!
//! Synthesized audio and uploaded voice samples live in an object store,
//! addressed by key. The datastore records keys only; URLs are minted at read
//! time through [`BlobStore::url_for`], so every artifact follows the same
//! access policy and an expired URL never invalidates a stored record.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{StorageBackend, StorageConfig};

pub mod local;
pub mod s3;

pub use local::LocalBlobStore;
pub use s3::S3BlobStore;

/// Result type for artifact store operations
pub type Result<T> = std::result::Result<T, BlobError>;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("Invalid artifact key: {0}")]
    InvalidKey(String),

    #[error("Artifact store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact store backend error: {0}")]
    Backend(String),
}

impl From<BlobError> for crate::errors::Error {
    fn from(err: BlobError) -> Self {
        crate::errors::Error::Other(anyhow::Error::new(err))
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()>;

    /// URL the caller can fetch the artifact from.
    async fn url_for(&self, key: &str) -> Result<String>;

    /// Remove the artifact. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Create the configured artifact store.
pub async fn create_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    match &config.backend {
        StorageBackend::S3 {
            bucket,
            region,
            endpoint,
            force_path_style,
        } => Ok(Arc::new(
            S3BlobStore::connect(
                bucket,
                region.as_deref(),
                endpoint.as_deref(),
                *force_path_style,
                config.url_ttl,
                config.timeout,
            )
            .await?,
        )),
        StorageBackend::Local { path, public_base_url } => Ok(Arc::new(LocalBlobStore::new(path.clone(), public_base_url.clone())?)),
    }
}

/// Reject keys that are empty, absolute or escape their prefix.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key.split('/').all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if valid { Ok(()) } else { Err(BlobError::InvalidKey(key.to_string())) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("tts/0d6f6c8e.wav").is_ok());
        assert!(validate_key("voices/acc/1700000000000-sample.wav").is_ok());

        for bad in ["", "/etc/passwd", "tts/../secrets", "tts//x.wav", "./x", "a\\b"] {
            assert!(validate_key(bad).is_err(), "{bad} should be rejected");
        }
    }
}
