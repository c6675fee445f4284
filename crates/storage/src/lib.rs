//! Object storage abstraction for avatar images.
//!
//! Uploads are never retried here; callers get a single [`StorageError`].

mod local;
mod s3;

pub use local::LocalStorage;
pub use s3::{S3Config, S3Storage};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload of {key} failed: {reason}")]
    Upload { key: String, reason: String },
    #[error("delete of {key} failed: {reason}")]
    Delete { key: String, reason: String },
    #[error("invalid storage configuration: {0}")]
    Config(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public URL under which `key` can be fetched.
    fn resolve_url(&self, key: &str) -> String;
}

/// Deterministic storage key for a user's avatar.
pub fn avatar_key(user_id: i64) -> String {
    format!("avatars/{user_id}_avatar.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_key_is_per_user() {
        assert_eq!(avatar_key(42), "avatars/42_avatar.jpg");
    }
}
