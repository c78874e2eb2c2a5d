use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;

use super::{validate_key, BlobStore};

/// Blob store rooted at a local directory.
pub struct FileBlobStore {
    root: PathBuf,
    signing_secret: String,
}

impl FileBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            signing_secret: String::new(),
        }
    }

    pub fn with_signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.signing_secret = secret.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn signature(&self, key: &str, content_type: &str, expires: i64) -> String {
        let mut hasher = DefaultHasher::new();
        self.signing_secret.hash(&mut hasher);
        key.hash(&mut hasher);
        content_type.hash(&mut hasher);
        expires.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;

        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::ReadFile { path, source: e }),
        }
    }

    async fn signed_read_url(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let path = self.path_for(key)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let expires = Utc::now().timestamp().saturating_add(ttl_secs);
        let signature = self.signature(key, content_type, expires);

        Ok(format!(
            "file://{}?content_type={}&expires={}&signature={}",
            path.display(),
            content_type.replace('/', "%2F"),
            expires,
            signature
        ))
    }
}
