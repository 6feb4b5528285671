//! API error types.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use storybook_pipeline::PipelineError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Story generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Upstream service failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Pipeline(e) => match e {
                PipelineError::InputMissing(_) => StatusCode::BAD_REQUEST,
                PipelineError::FrameExtractionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
                PipelineError::EncodingFailed(_) | PipelineError::ConfigError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ if e.is_upstream() => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Timeout(_) => "TIMEOUT",
            ApiError::Upstream(_) => "UPSTREAM_FAILED",
            ApiError::Pipeline(e) => e.code(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::BadRequest(format!("invalid multipart body: {}", e))
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storybook_models::AssetRole;
    use storybook_pipeline::StageError;

    #[test]
    fn test_pipeline_status_mapping() {
        let missing: ApiError = PipelineError::InputMissing(AssetRole::Subject).into();
        assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.code(), "INPUT_MISSING");

        let publish: ApiError = PipelineError::AssetPublishFailed(StageError::permanent("x")).into();
        assert_eq!(publish.status_code(), StatusCode::BAD_GATEWAY);

        let frame: ApiError = PipelineError::FrameExtractionFailed(StageError::permanent("x")).into();
        assert_eq!(frame.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        assert_eq!(ApiError::Timeout(300).status_code(), StatusCode::GATEWAY_TIMEOUT);
    }
}
