//! Error types for the GAN trainer

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, GanError>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum GanError {
    /// Invalid configuration (image size, batch size, ...)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Dataset could not be opened or is unusable
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// libtorch error (shape mismatch, device, checkpoint format)
    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Scalar log error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl GanError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a dataset error
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }
}
