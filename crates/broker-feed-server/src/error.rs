use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use broker_feed_core::error::FeedError;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

/// HTTP face of a [`FeedError`]. Failures never carry a partial payload.
#[derive(Debug)]
pub struct ApiError(pub FeedError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            FeedError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            FeedError::DataSourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self.0 {
            FeedError::InvalidParameter { .. } => "invalid_parameter",
            FeedError::DataSourceUnavailable(_) => "data_source_unavailable",
        }
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("request failed: {}", self.0);
        }
        let body = Json(ErrorResponse {
            code: self.code(),
            message: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ApiError {}
