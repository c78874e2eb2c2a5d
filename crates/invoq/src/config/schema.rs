use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_blob_directory")]
    pub blob_directory: String,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub reclaimer: ReclaimerConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_blob_directory() -> String {
    "blobs".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            blob_directory: default_blob_directory(),
            ocr: OcrConfig::default(),
            preprocessing: PreprocessingConfig::default(),
            approval: ApprovalConfig::default(),
            reclaimer: ReclaimerConfig::default(),
            quality: QualityConfig::default(),
            notifications: NotificationsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_early_abort_min_words")]
    pub early_abort_min_words: u32,
    #[serde(default = "default_early_abort_min_confidence")]
    pub early_abort_min_confidence: f64,
    /// Base URL of the HTTP OCR provider.
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_early_abort_min_words() -> u32 {
    5
}

fn default_early_abort_min_confidence() -> f64 {
    10.0
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            early_abort_min_words: default_early_abort_min_words(),
            early_abort_min_confidence: default_early_abort_min_confidence(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,
    #[serde(default = "default_max_dimension")]
    pub max_height: u32,
    /// Largest linear upscale factor.
    #[serde(default = "default_max_upscale")]
    pub max_upscale: f32,
    #[serde(default = "default_contrast")]
    pub contrast: f32,
    #[serde(default = "default_denoise_sigma")]
    pub denoise_sigma: f32,
}

fn default_max_dimension() -> u32 {
    4000
}

fn default_max_upscale() -> f32 {
    2.0
}

fn default_contrast() -> f32 {
    25.0
}

fn default_denoise_sigma() -> f32 {
    0.6
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            max_upscale: default_max_upscale(),
            contrast: default_contrast(),
            denoise_sigma: default_denoise_sigma(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// Minimum OCR confidence (0-100) for auto-approval.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_min_confidence() -> f64 {
    90.0
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReclaimerConfig {
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_batch_limit")]
    pub batch_limit: u32,
}

fn default_stale_after_secs() -> u64 {
    300
}

fn default_interval_secs() -> u64 {
    60
}

fn default_batch_limit() -> u32 {
    100
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
            interval_secs: default_interval_secs(),
            batch_limit: default_batch_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Word list or Hunspell `.dic` file. Typo detection is off without one.
    #[serde(default)]
    pub dictionary_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    256
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string, overridden by `RUST_LOG`.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}
