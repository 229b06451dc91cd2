//! Error types for the prediction gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::adapter::AdapterError;

/// One invalid field of a clinical record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every invalid field of a request, in field order.
#[derive(Debug, Clone, PartialEq, Default, thiserror::Error)]
#[error("{}", render_fields(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a given field was reported.
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }
}

fn render_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error types for gateway operations.
///
/// Input-side variants are raised before any adapter is called.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Unsupported analysis type: {0}")]
    UnsupportedAnalysisType(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Inference timed out after {deadline_ms}ms waiting for {model}")]
    InferenceTimeout { model: String, deadline_ms: u128 },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model output invalid: {0}")]
    ModelOutputInvalid(String),
}

impl Error {
    /// Machine-readable error type used in response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::UnsupportedAnalysisType(_) => "unsupported_analysis_type",
            Error::InvalidImage(_) => "invalid_image",
            Error::InferenceTimeout { .. } => "inference_timeout",
            Error::ModelUnavailable(_) => "model_unavailable",
            Error::ModelOutputInvalid(_) => "model_output_invalid",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::UnsupportedAnalysisType(_)
            | Error::InvalidImage(_) => StatusCode::BAD_REQUEST,
            Error::InferenceTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::ModelUnavailable(_) | Error::ModelOutputInvalid(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Translate an adapter failure for the named model.
    pub fn from_adapter(model: &str, err: AdapterError) -> Self {
        match err {
            AdapterError::Unavailable(msg) | AdapterError::Failed(msg) => {
                Error::ModelUnavailable(format!("{}: {}", model, msg))
            }
            AdapterError::InvalidOutput(msg) => {
                Error::ModelOutputInvalid(format!("{}: {}", model, msg))
            }
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut error = json!({
            "type": self.kind(),
            "message": self.to_string()
        });
        if let Error::Validation(errors) = &self {
            error["fields"] = json!(errors.fields());
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
