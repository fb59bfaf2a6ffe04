//! Amazon S3 blob store.

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use super::BlobStore;
use crate::aws::AwsContext;
use crate::error::{Error, Result};

/// A blob store backed by one S3 bucket.
///
/// With a custom endpoint, path-style addressing is used, which suits
/// S3-compatible servers such as MinIO.
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    aws: AwsContext,
}

impl S3BlobStore {
    /// Create a store for `bucket`.
    pub fn new(aws: &AwsContext, bucket: impl Into<String>) -> Result<Self> {
        Self::build(aws, bucket.into(), None)
    }

    /// Create a store for `bucket` on a custom endpoint.
    pub fn with_endpoint(
        aws: &AwsContext,
        bucket: impl Into<String>,
        endpoint: &str,
    ) -> Result<Self> {
        Self::build(aws, bucket.into(), Some(endpoint))
    }

    fn build(aws: &AwsContext, bucket: String, endpoint: Option<&str>) -> Result<Self> {
        if bucket.is_empty() {
            return Err(Error::Config("bucket name is empty".to_string()));
        }

        let mut config = aws_sdk_s3::config::Builder::from(aws.sdk_config());
        if let Some(endpoint) = endpoint {
            config = config
                .endpoint_url(endpoint.trim_end_matches('/'))
                .force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(config.build()),
            bucket,
            aws: aws.clone(),
        })
    }

    fn storage_error<E: std::error::Error>(&self, key: &str, err: E) -> Error {
        Error::Storage(format!(
            "s3://{}/{}: {}",
            self.bucket,
            key,
            DisplayErrorContext(err)
        ))
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                e if e.is_no_such_key() => Error::NotFound(key.to_string()),
                e => self.storage_error(key, e),
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| self.storage_error(key, e))?;
        Ok(bytes.to_vec())
    }

    async fn put_object(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| self.storage_error(key, e))?;
        Ok(())
    }

    async fn head_object(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match e.into_service_error() {
                e if e.is_not_found() => Ok(false),
                e => Err(self.storage_error(key, e)),
            },
        }
    }
}

impl BlobStore for S3BlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.aws.block_on(self.get_object(key))
    }

    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        self.aws.block_on(self.put_object(key, data, content_type))?;
        log::debug!("Stored s3://{}/{} ({} bytes)", self.bucket, key, data.len());
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.aws.block_on(self.head_object(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::offline_context;

    #[test]
    fn test_bucket_name() {
        let store = S3BlobStore::new(&offline_context("us-west-2"), "docs").unwrap();
        assert_eq!(store.bucket(), "docs");
    }

    #[test]
    fn test_custom_endpoint() {
        let aws = offline_context("us-west-2");
        let store = S3BlobStore::with_endpoint(&aws, "docs", "http://localhost:9000/").unwrap();
        assert_eq!(store.bucket(), "docs");
    }

    #[test]
    fn test_empty_bucket_rejected() {
        let aws = offline_context("us-west-2");
        assert!(matches!(S3BlobStore::new(&aws, ""), Err(Error::Config(_))));
    }

    #[test]
    fn test_storage_error_names_object() {
        let store = S3BlobStore::new(&offline_context("us-west-2"), "docs").unwrap();
        let err = store.storage_error("uploads/a.pdf", std::io::Error::other("boom"));
        assert!(matches!(err, Error::Storage(m) if m.starts_with("s3://docs/uploads/a.pdf: boom")));
    }
}
