//! Error types for the detection pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Label count {labels} differs from feature count {features}")]
    SizeMismatch { labels: usize, features: usize },

    #[error("No model: train one or load one from file first")]
    NoModel,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt model: {0}")]
    CorruptModel(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid label: {0}")]
    InvalidLabel(f64),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<serde_json::Error> for DetectorError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            DetectorError::Io(e.into())
        } else {
            DetectorError::Serialization(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, DetectorError>;
