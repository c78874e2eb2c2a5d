use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoqError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Preprocessing error: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error("OCR provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid blob key '{0}'")]
    InvalidKey(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Image is {width}x{height}, larger than the {max_width}x{max_height} limit")]
    TooLarge {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Transform task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("OCR request failed: {0}")]
    Request(String),

    #[error("OCR provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("OCR provider rejected the job ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Malformed OCR provider response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Supplier resolution failed: {0}")]
    Supplier(String),

    #[error("Accounting lookup failed: {0}")]
    Accounting(String),

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to publish '{event}' on '{channel}': {reason}")]
    Publish {
        channel: String,
        event: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, InvoqError>;
