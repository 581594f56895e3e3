//! The single mapping from [`PropvalError`] to an HTTP response.
//!
//! Every body has the shape `{"detail": ...}`: a list of field errors for
//! validation failures, a message string otherwise.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::common::error::PropvalError;

/// Status code and `detail` payload for an error.
pub fn status_and_detail(err: &PropvalError) -> (StatusCode, Value) {
    match err {
        PropvalError::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, json!(errors.0)),
        PropvalError::ModelNotLoaded => (StatusCode::SERVICE_UNAVAILABLE, json!(err.to_string())),
        PropvalError::ModelUnavailable | PropvalError::Inference(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, json!(err.to_string()))
        }
        PropvalError::DataAcquisition(_) | PropvalError::Artifact(_) | PropvalError::Config(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, json!("Internal server error"))
        }
    }
}

impl IntoResponse for PropvalError {
    fn into_response(self) -> Response {
        let (status, detail) = status_and_detail(&self);
        if status.is_server_error() {
            tracing::warn!(code = self.code() as u32, error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code() as u32, error = %self, "request rejected");
        }
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
