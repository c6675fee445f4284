//! S3-compatible storage client.

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{BehaviorVersion, Region},
    primitives::ByteStream,
    Client,
};
use tracing::{debug, error, info};

use crate::{ObjectStorage, StorageError};

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl S3Config {
    /// Parse S3 URL: `http://host:port/bucket-name/`
    pub fn from_url(
        url: &str,
        access_key_id: String,
        secret_access_key: String,
    ) -> Result<Self, StorageError> {
        let url = url.trim_end_matches('/');
        let last_slash = url
            .rfind('/')
            .ok_or_else(|| StorageError::Config("Invalid S3 URL format".to_string()))?;

        let (endpoint, bucket) = url.split_at(last_slash);
        let bucket = &bucket[1..];

        if bucket.is_empty() || endpoint.ends_with('/') || endpoint.is_empty() {
            return Err(StorageError::Config(
                "S3 URL must contain bucket name".to_string(),
            ));
        }

        Ok(Self {
            endpoint: endpoint.to_string(),
            bucket: bucket.to_string(),
            access_key_id,
            secret_access_key,
        })
    }
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    endpoint: String,
    bucket: String,
}

impl S3Storage {
    pub fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "profiled",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new("us-east-1")) // ignored by MinIO
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        info!(bucket = %config.bucket, endpoint = %config.endpoint, "S3 storage initialized");

        Self {
            client: Client::from_conf(s3_config),
            endpoint: config.endpoint,
            bucket: config.bucket,
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        debug!(key, size = data.len(), "Uploading object");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                error!(key, error = ?e, "S3 upload failed");
                StorageError::Upload {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;

        info!(key, "Object uploaded");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                error!(key, error = ?e, "S3 delete failed");
                StorageError::Delete {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;

        info!(key, "Object deleted");
        Ok(())
    }

    fn resolve_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bucket_from_url() {
        let config = S3Config::from_url(
            "http://localhost:9000/avatars-bucket/",
            "key".to_string(),
            "secret".to_string(),
        )
        .unwrap();

        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.bucket, "avatars-bucket");
    }

    #[test]
    fn rejects_url_without_bucket() {
        assert!(S3Config::from_url("http://localhost:9000/", String::new(), String::new()).is_err());
    }

    #[test]
    fn resolves_path_style_url() {
        let config = S3Config::from_url(
            "http://localhost:9000/media",
            "key".to_string(),
            "secret".to_string(),
        )
        .unwrap();
        let storage = S3Storage::new(config);

        assert_eq!(
            storage.resolve_url("avatars/1_avatar.jpg"),
            "http://localhost:9000/media/avatars/1_avatar.jpg"
        );
    }
}
