/// Structured error types for zepctl-core library.
///
/// Uses `thiserror` for better API surface and error composition.
/// The binary crate (zepctl-cli) uses `anyhow` for convenience,
/// but library consumers get structured, composable errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for zepctl-core operations
#[derive(Error, Debug)]
pub enum ConvertError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// JSON parsing failed
    #[error("JSON error at {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    /// Input is not a notebook document
    #[error("Invalid notebook in {path:?}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    /// Required field missing
    #[error("Missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// Invalid timestamp format
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Embedded base64 image could not be decoded
    #[error("Failed to decode embedded image: {source}")]
    ImageDecode {
        #[from]
        source: base64::DecodeError,
    },

    /// Embedded SVG could not be rasterized
    #[error("Failed to render SVG: {reason}")]
    SvgRender { reason: String },
}

/// Result type alias for zepctl-core operations
pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Create a JSON error with context
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid format error
    pub fn invalid_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create an invalid timestamp error
    pub fn invalid_timestamp(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an SVG rendering error
    pub fn svg_render(reason: impl Into<String>) -> Self {
        Self::SvgRender {
            reason: reason.into(),
        }
    }
}
