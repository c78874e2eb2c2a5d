use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Validation { message }
}

pub(crate) fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    if !(1..=3).contains(&config.ocr.max_attempts) {
        return Err(invalid(format!(
            "ocr.max_attempts must be between 1 and 3, got {}",
            config.ocr.max_attempts
        )));
    }

    if !(0.0..=100.0).contains(&config.ocr.early_abort_min_confidence) {
        return Err(invalid(format!(
            "ocr.early_abort_min_confidence must be between 0 and 100, got {}",
            config.ocr.early_abort_min_confidence
        )));
    }

    let pre = &config.preprocessing;
    if pre.max_width == 0 || pre.max_height == 0 {
        return Err(invalid(
            "preprocessing.max_width and max_height must be positive".to_string(),
        ));
    }
    if !(1.0..=2.0).contains(&pre.max_upscale) {
        return Err(invalid(format!(
            "preprocessing.max_upscale must be between 1 and 2, got {}",
            pre.max_upscale
        )));
    }
    if pre.denoise_sigma < 0.0 {
        return Err(invalid(
            "preprocessing.denoise_sigma must not be negative".to_string(),
        ));
    }

    if !(0.0..=100.0).contains(&config.approval.min_confidence) {
        return Err(invalid(format!(
            "approval.min_confidence must be between 0 and 100, got {}",
            config.approval.min_confidence
        )));
    }

    if config.reclaimer.stale_after_secs == 0 {
        return Err(invalid(
            "reclaimer.stale_after_secs must be positive".to_string(),
        ));
    }
    if config.reclaimer.interval_secs == 0 {
        return Err(invalid("reclaimer.interval_secs must be positive".to_string()));
    }

    if config.notifications.capacity == 0 {
        return Err(invalid(
            "notifications.capacity must be positive".to_string(),
        ));
    }

    if let Some(endpoint) = &config.ocr.endpoint {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(invalid(format!(
                "ocr.endpoint must be an http(s) URL, got '{}'",
                endpoint
            )));
        }
    }

    Ok(())
}
