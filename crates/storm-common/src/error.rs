//! Error types for the storm-gif pipeline.

use thiserror::Error;

/// Result type alias using StormError.
pub type StormResult<T> = Result<T, StormError>;

/// Primary error type for every pipeline stage.
#[derive(Debug, Error)]
pub enum StormError {
    // === Input Errors ===
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    // === Geometry Errors ===
    #[error("Watershed file contains no geometries: {0}")]
    EmptyGeometry(String),

    #[error("Invalid watershed geometry: {0}")]
    InvalidGeometry(String),

    // === Data Errors ===
    #[error("Failed to open precipitation dataset: {0}")]
    DatasetOpen(String),

    #[error("No data found in bounds: {0}")]
    NoDataInBounds(String),

    // === Rendering Errors ===
    #[error("Rendering failed: {0}")]
    Render(String),

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to upload to {destination}: {message}")]
    Upload { destination: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StormError {
    /// Short machine-readable name of the failure class, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            StormError::InvalidInput(_) => "InvalidInputError",
            StormError::Config(_) => "ConfigError",
            StormError::EmptyGeometry(_) => "EmptyGeometryError",
            StormError::InvalidGeometry(_) => "InvalidGeometryError",
            StormError::DatasetOpen(_) => "DatasetOpenError",
            StormError::NoDataInBounds(_) => "NoDataInBoundsError",
            StormError::Render(_) => "RenderError",
            StormError::Storage(_) => "StorageError",
            StormError::Upload { .. } => "UploadError",
            StormError::Io(_) => "IoError",
        }
    }

    /// Build an upload error for the given destination.
    pub fn upload(destination: impl Into<String>, message: impl Into<String>) -> Self {
        StormError::Upload {
            destination: destination.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StormError {
    fn from(err: serde_json::Error) -> Self {
        StormError::InvalidInput(format!("JSON error: {}", err))
    }
}
