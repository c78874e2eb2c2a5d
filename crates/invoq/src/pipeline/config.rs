use std::time::Duration;

use crate::config::{Config, PreprocessingConfig};

/// Runtime settings derived from the loaded [`Config`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_attempts: u32,
    pub early_abort_min_words: u32,
    pub early_abort_min_confidence: f64,
    pub preprocessing: PreprocessingConfig,
    pub min_approval_confidence: f64,
    pub stale_after: Duration,
    pub reclaim_batch_limit: u32,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.ocr.max_attempts,
            early_abort_min_words: config.ocr.early_abort_min_words,
            early_abort_min_confidence: config.ocr.early_abort_min_confidence,
            preprocessing: config.preprocessing.clone(),
            min_approval_confidence: config.approval.min_confidence,
            stale_after: Duration::from_secs(config.reclaimer.stale_after_secs),
            reclaim_batch_limit: config.reclaimer.batch_limit,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.early_abort_min_words, 5);
        assert_eq!(config.min_approval_confidence, 90.0);
        assert_eq!(config.stale_after, Duration::from_secs(300));
    }
}
