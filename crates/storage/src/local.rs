//! Filesystem-backed storage for development setups.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::{ObjectStorage, StorageError};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Maps a key to a path under the root, refusing keys that would escape it.
    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let upload_err = |reason: String| StorageError::Upload {
            key: key.to_string(),
            reason,
        };

        let path = self
            .path_for(key)
            .ok_or_else(|| upload_err("key escapes storage root".to_string()))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| upload_err(e.to_string()))?;
        }

        tokio::fs::write(&path, data).await.map_err(|e| {
            error!(key, error = %e, "Local upload failed");
            upload_err(e.to_string())
        })?;

        debug!(key, path = %path.display(), "Object stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let delete_err = |reason: String| StorageError::Delete {
            key: key.to_string(),
            reason,
        };

        let path = self
            .path_for(key)
            .ok_or_else(|| delete_err("key escapes storage root".to_string()))?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(delete_err(e.to_string())),
        }
    }

    fn resolve_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}
