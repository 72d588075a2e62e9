//! Artifacts on local disk, served by this process under `/artifacts`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use url::Url;

use super::{BlobError, BlobStore, Result, validate_key};

pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: Url,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf, public_base_url: Url) -> Result<Self> {
        std::fs::create_dir_all(&root)?;

        // Url::join drops the last path segment unless the base ends in '/'
        let mut public_base_url = public_base_url;
        if !public_base_url.path().ends_with('/') {
            let path = format!("{}/", public_base_url.path());
            public_base_url.set_path(&path);
        }

        Ok(Self { root, public_base_url })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        debug!(key, content_type, size = bytes.len(), "Stored artifact on disk");
        Ok(())
    }

    async fn url_for(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        self.public_base_url
            .join(key)
            .map(String::from)
            .map_err(|e| BlobError::InvalidKey(format!("{key}: {e}")))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
