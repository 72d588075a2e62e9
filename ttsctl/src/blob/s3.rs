//! S3 (or S3-compatible) artifact store with presigned read URLs.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Region, timeout::TimeoutConfig},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use bytes::Bytes;
use tracing::{debug, instrument};

use super::{BlobError, BlobStore, Result, validate_key};

/// S3 rejects presigned URLs valid for longer than seven days
const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub struct S3BlobStore {
    client: Client,
    bucket: String,
    url_ttl: Duration,
}

impl S3BlobStore {
    /// Build a client from the default AWS credential chain (environment, profile, IAM role).
    pub async fn connect(
        bucket: &str,
        region: Option<&str>,
        endpoint: Option<&str>,
        force_path_style: bool,
        url_ttl: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(force_path_style)
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self::new(Client::from_conf(builder.build()), bucket.to_string(), url_ttl))
    }

    pub fn new(client: Client, bucket: String, url_ttl: Duration) -> Self {
        Self {
            client,
            bucket,
            url_ttl: url_ttl.min(MAX_PRESIGN_TTL),
        }
    }
}

fn backend_error<E: std::error::Error>(e: E) -> BlobError {
    BlobError::Backend(DisplayErrorContext(e).to_string())
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self, bytes), fields(bucket = %self.bucket, size = bytes.len()), err)]
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        validate_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(backend_error)?;
        debug!("Uploaded artifact");
        Ok(())
    }

    async fn url_for(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        let presigning = PresigningConfig::expires_in(self.url_ttl).map_err(backend_error)?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(backend_error)?;
        Ok(request.uri().to_string())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket), err)]
    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}
