//! Error handling primitives shared across the core.
//!
//! Every failure the crate can report is a [`PropvalError`]. The HTTP layer
//! converts it to a response in exactly one place (`api::error`), and log
//! events tag it with a stable [`ErrorCode`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::training::artifact::ArtifactError;

/// Stable error codes attached to log events.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Request input failed validation.
    InvalidInput = 1,
    /// No model artifact is loaded.
    ModelMissing = 2,
    /// The loaded model failed while predicting.
    Inference = 3,
    /// Training data could not be obtained.
    DataAcquisition = 4,
    /// Artifact could not be written or read back.
    Artifact = 5,
    /// Configuration value was missing or malformed.
    Config = 6,
    /// Unexpected fault outside the taxonomy, e.g. a handler panic.
    Internal = 7,
}

/// One rejected field of a request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Location of the offending value, e.g. `["body", "Longitude"]`.
    pub loc: Vec<String>,
    /// Human readable description.
    pub msg: String,
    /// Machine readable kind (`missing`, `float_type`, `float_parsing`, ...).
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(loc: &[&str], msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: loc.iter().map(|s| s.to_string()).collect(),
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    /// Name of the rejected field (last path segment).
    pub fn field(&self) -> &str {
        self.loc.last().map(String::as_str).unwrap_or("body")
    }
}

/// All field violations found in one request, in schema order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, err: FieldError) {
        self.0.push(err);
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(FieldError::field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", err.field(), err.msg)?;
        }
        Ok(())
    }
}

/// Canonical error type for the crate.
#[derive(Debug, Error)]
pub enum PropvalError {
    /// Malformed, missing or mistyped request fields.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Health check while no model is loaded.
    #[error("Model not loaded")]
    ModelNotLoaded,

    /// Prediction requested while no model is loaded.
    #[error("Model is not available")]
    ModelUnavailable,

    /// The loaded model faulted while predicting.
    #[error("Prediction failed: {0}")]
    Inference(String),

    /// Training data could not be obtained or is malformed.
    #[error("data acquisition failed: {0}")]
    DataAcquisition(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type PropvalResult<T> = Result<T, PropvalError>;

impl PropvalError {
    pub fn data(msg: impl Into<String>) -> Self {
        Self::DataAcquisition(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::InvalidInput,
            Self::ModelNotLoaded | Self::ModelUnavailable => ErrorCode::ModelMissing,
            Self::Inference(_) => ErrorCode::Inference,
            Self::DataAcquisition(_) => ErrorCode::DataAcquisition,
            Self::Artifact(_) => ErrorCode::Artifact,
            Self::Config(_) => ErrorCode::Config,
        }
    }
}
