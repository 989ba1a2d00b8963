//! Unified error handling for the HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::service::ReportError;

/// Application-level error type for handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Report generation failed.
    #[error("{0}")]
    Report(#[from] ReportError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body returned for every error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    #[serde(rename = "where")]
    pub phase: &'static str,
    pub error: String,
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Report(ReportError::InvalidWindow(_) | ReportError::StorageNotConfigured)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Report(ReportError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Report(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn phase(&self) -> &'static str {
        match self {
            Self::Report(err) => err.phase(),
            Self::BadRequest(_) => "request",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, phase = self.phase(), "Report request failed");
        }

        // Don't expose internal error details to clients
        let error = match &self {
            Self::Report(ReportError::DataLoad(_)) => "Failed to load report data".to_string(),
            Self::Report(ReportError::Render(_)) => "Failed to render report".to_string(),
            Self::Report(ReportError::Storage(_)) => "Failed to store report".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorBody {
            ok: false,
            phase: self.phase(),
            error,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::source::SourceError;
    use std::time::Duration;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("missing from".to_string());
        assert_eq!(err.to_string(), "Bad request: missing from");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Report(ReportError::StorageNotConfigured)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Report(ReportError::Timeout(Duration::from_secs(60)))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_data_load_hides_details() {
        let io = std::io::Error::other("password=hunter2");
        let err = AppError::Report(ReportError::DataLoad(SourceError::Io(io)));

        assert_eq!(err.phase(), "data_load");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
