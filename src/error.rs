use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for labelsdk operations.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to parse JSON from {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse or write COCO JSON: {0}")]
    CocoJson(#[source] serde_json::Error),

    #[error("Invalid COCO data: {0}")]
    CocoInvalid(String),

    #[error("Invalid run-length encoding: {0}")]
    Rle(String),

    #[error("Failed to read or write mask image {path}: {source}")]
    MaskImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Remote task failed. Details: {message}")]
    TaskFailed { message: String },

    #[error("Unable to complete remote task within {budget:?}")]
    Timeout { budget: Duration },

    #[error("No role named {name} exists. Valid names are one of {valid:?}")]
    UnknownRole { name: String, valid: Vec<String> },

    #[error("Unexpected response at '{path}': {message}")]
    UnexpectedResponse { path: String, message: String },

    #[error("Remote call failed: {0}")]
    Remote(String),

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}
