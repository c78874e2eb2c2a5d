//! Preprocessing escalation for image uploads.
//!
//! Each attempt gets a stronger recipe. Derived assets are written next to
//! the original under `<key>.attempt-<n>.png`; the original is never
//! modified.

pub mod recipe;
pub mod transform;

use std::sync::Arc;

use tracing::{debug, info_span, Instrument};

use crate::config::PreprocessingConfig;
use crate::error::PreprocessError;
use crate::sanitize;
use crate::storage::BlobStore;

pub use recipe::{recipe_for, PreprocessFlag, Recipe};
pub use transform::{ImageTransformer, RasterTransformer, TransformOptions, TransformOutput};

/// The asset to submit for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedAsset {
    pub key: String,
    pub mime_type: String,
    pub flags: Vec<PreprocessFlag>,
    pub native_deskew: bool,
}

impl PreparedAsset {
    /// Untouched original.
    pub fn original(key: &str, mime_type: &str) -> Self {
        Self {
            key: key.to_string(),
            mime_type: mime_type.to_string(),
            flags: Vec::new(),
            native_deskew: false,
        }
    }
}

pub fn is_image(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

pub fn derived_key(original_key: &str, attempt: u32) -> String {
    format!("{}.attempt-{}.png", original_key, attempt)
}

pub struct PreprocessingController {
    blobs: Arc<dyn BlobStore>,
    transformer: Arc<dyn ImageTransformer>,
    settings: PreprocessingConfig,
}

impl PreprocessingController {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        transformer: Arc<dyn ImageTransformer>,
        settings: PreprocessingConfig,
    ) -> Self {
        Self {
            blobs,
            transformer,
            settings,
        }
    }

    /// Prepares the asset for `attempt`. Non-images pass through.
    pub async fn prepare(
        &self,
        key: &str,
        mime_type: &str,
        attempt: u32,
    ) -> Result<PreparedAsset, PreprocessError> {
        if !is_image(mime_type) {
            return Ok(PreparedAsset::original(key, mime_type));
        }

        let span = info_span!("preprocess", key = %sanitize::redact_key(key), attempt);
        self.prepare_image(key, mime_type, attempt)
            .instrument(span)
            .await
    }

    async fn prepare_image(
        &self,
        key: &str,
        mime_type: &str,
        attempt: u32,
    ) -> Result<PreparedAsset, PreprocessError> {
        let options = match recipe_for(attempt, &self.settings) {
            Recipe::ProviderDeskew => {
                return Ok(PreparedAsset {
                    flags: vec![PreprocessFlag::ProviderDeskew],
                    native_deskew: true,
                    ..PreparedAsset::original(key, mime_type)
                });
            }
            Recipe::Transform(options) => options,
        };

        let bytes = self.blobs.get(key).await?;
        let output = self.transformer.transform(bytes, &options).await?;

        if output.applied.is_empty() {
            debug!("No transform applied, submitting original");
            return Ok(PreparedAsset::original(key, mime_type));
        }

        let derived = derived_key(key, attempt);
        let stored = self.blobs.put(&derived, output.bytes, "image/png").await?;
        debug!(
            width = output.width,
            height = output.height,
            flags = ?output.applied,
            "Derived asset written"
        );

        Ok(PreparedAsset {
            key: stored,
            mime_type: "image/png".to_string(),
            flags: output.applied,
            native_deskew: false,
        })
    }
}
