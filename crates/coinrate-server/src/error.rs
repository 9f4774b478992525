use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coinrate::market_data::PriceError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Price(#[from] PriceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Price(err) => match err {
                PriceError::InvalidParameter(_) => {
                    (StatusCode::BAD_REQUEST, err.code(), err.to_string())
                }
                PriceError::NotFound { .. } => (StatusCode::NOT_FOUND, err.code(), err.to_string()),
                PriceError::UpstreamFailure { .. } => {
                    error!(error = ?err, "price source failure");
                    (
                        StatusCode::BAD_GATEWAY,
                        err.code(),
                        "Price source unavailable".to_string(),
                    )
                }
                PriceError::InternalFailure { .. } => {
                    error!(error = ?err, "price store failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        err.code(),
                        "Internal server error".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}
