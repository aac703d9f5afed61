use std::path::PathBuf;
use thiserror::Error;

/// Main error type for creatorscan
#[derive(Error, Debug)]
pub enum ScanError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// The content source cannot be reached at all
    #[error("Content source unavailable: {0}")]
    SourceUnavailable(String),

    /// Replay fixture could not be used
    #[error("Fixture error in {path}: {message}")]
    Fixture { path: PathBuf, message: String },

    /// Run record not found
    #[error("Run not found: {id}")]
    RunNotFound { id: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// CSV errors
    #[error("CSV error: {context}: {source}")]
    Csv { source: csv::Error, context: String },

    /// Async runtime errors (worker pool setup, joined task panics)
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for creatorscan operations
pub type Result<T> = std::result::Result<T, ScanError>;
