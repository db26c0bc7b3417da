//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use murmur::MurmurError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Service(#[from] MurmurError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Service(MurmurError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            AppError::Service(MurmurError::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedPayload(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        }

        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::MalformedPayload("eof".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(MurmurError::InvalidInput("body is required".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(MurmurError::StoreUnavailable("down".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(MurmurError::Encoding("bad".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(MurmurError::StoreRejected("WRONGTYPE".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
