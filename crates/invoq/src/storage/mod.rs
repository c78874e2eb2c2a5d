//! Blob storage for original uploads and derived preprocessing assets.

pub mod filesystem;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;

pub use filesystem::FileBlobStore;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the key.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Time-limited read URL for `key`.
    async fn signed_read_url(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;
}

/// Rejects keys that could escape the store root.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let escapes = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");

    if escapes {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// `tenant/document/filename` key for an original upload.
pub fn original_key(tenant_id: &str, document_id: &str, filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim_matches('.');
    let safe = if safe.is_empty() { "upload" } else { safe };
    format!("{}/{}/{}", tenant_id, document_id, safe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("tenant/doc/invoice.pdf").is_ok());
        assert!(validate_key("tenant/doc/invoice.pdf.attempt-2.png").is_ok());

        for bad in ["", "/etc/passwd", "a/../b", "../x", "a//b", "a\\b", "./a"] {
            assert!(validate_key(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_original_key_sanitizes_filename() {
        assert_eq!(
            original_key("t1", "d1", "Invoice March.pdf"),
            "t1/d1/Invoice_March.pdf"
        );
        assert_eq!(original_key("t1", "d1", "../../etc"), "t1/d1/_.._etc");
        assert_eq!(original_key("t1", "d1", ".."), "t1/d1/upload");
        assert!(validate_key(&original_key("t1", "d1", "../../etc")).is_ok());
    }
}
