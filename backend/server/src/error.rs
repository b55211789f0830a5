use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use registry::error::{FetchError, VerifyError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Registry unavailable: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<VerifyError> for AppError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::EmptyQuery | VerifyError::InvalidCategory(_) => {
                AppError::BadRequest(e.to_string())
            }
            VerifyError::Backend(source) => AppError::Upstream(source.to_string()),
        }
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::PageOutOfRange(_) => AppError::BadRequest(e.to_string()),
            FetchError::Backend(source) => AppError::Upstream(source.to_string()),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::InternalError(Box::new(e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
