//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fingraph_core::Error;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Pipeline(e) => match e {
                Error::NoGraph => StatusCode::NOT_FOUND,
                Error::ModelOutputInvalid { .. } => StatusCode::BAD_GATEWAY,
                Error::ModelUnavailable { .. } | Error::Configuration(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                Error::CacheIo { .. } | Error::Json(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Pipeline(e) => e.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let stage = match &self {
            ApiError::Pipeline(e) => e.stage().map(|s| s.as_str()),
            _ => None,
        };
        if status.is_server_error() {
            tracing::error!("{} {}: {}", status.as_u16(), self.kind(), self);
        } else {
            tracing::debug!("{} {}: {}", status.as_u16(), self.kind(), self);
        }
        let body = serde_json::json!({
            "error": {
                "kind": self.kind(),
                "stage": stage,
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
