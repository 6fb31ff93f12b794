use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the docrag pipeline
#[derive(Error, Debug)]
pub enum DocragError {
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

    /// Blank question or empty active-file set; caller error, reported without retry
    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// Vector dimensionality disagrees with the index; indicates a model/index mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding model failed to load or run; fatal for ingest and query paths
    #[error("Embedding model unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Generation backend unreachable; recovered by answering with retrieved context
    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// File format is not one the pipeline knows how to handle
    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    /// Text extraction failed for a declared format
    #[error("Extraction failed for {filename}: {message}")]
    ExtractionFailed { filename: String, message: String },

    /// Storage layer errors (pool, archive)
    #[error("Storage error: {0}")]
    Storage(String),

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

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DocragError {
    /// Build an `InvalidQuery` from anything string-like
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }
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

/// Result type for docrag operations
pub type Result<T> = std::result::Result<T, DocragError>;
