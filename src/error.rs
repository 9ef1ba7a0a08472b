use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} model is not loaded")]
    ModelLoading(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("failed to download page: {0}")]
    Fetch(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("model execution failed: {0}")]
    Inference(String),
    #[error("other: {0}")]
    Other(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Fetch(err.to_string())
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::BadRequest(rejection.body_text())
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::ModelLoading(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::BadRequest(_) | ServiceError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ServiceError::Fetch(_)
            | ServiceError::Tokenizer(_)
            | ServiceError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_client_errors() {
        assert_eq!(
            ServiceError::BadRequest("Text is required.".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidUrl("nope".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn missing_model_is_unavailable() {
        let err = ServiceError::ModelLoading("summarization");
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "summarization model is not loaded");
    }

    #[test]
    fn bad_request_message_is_verbatim() {
        let err = ServiceError::BadRequest("URL is required.".into());
        assert_eq!(err.to_string(), "URL is required.");
    }

    #[test]
    fn upstream_failures_are_server_errors() {
        assert_eq!(
            ServiceError::Fetch("timed out".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::Inference("shape mismatch".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
