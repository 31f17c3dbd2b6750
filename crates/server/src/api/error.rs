//! Mapping of library errors onto HTTP responses.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use vlibrary_core::LibraryError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Error returned while the library is disabled in config.
pub fn library_disabled() -> ApiError {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "Library is disabled")
}

pub fn status_for(error: &LibraryError) -> StatusCode {
    match error {
        LibraryError::NotFound(_) => StatusCode::NOT_FOUND,
        LibraryError::AlreadyExists { .. } | LibraryError::VideoRemoved { .. } => {
            StatusCode::CONFLICT
        }
        LibraryError::Metadata(_) | LibraryError::List(_) | LibraryError::Host(_) => {
            StatusCode::BAD_GATEWAY
        }
        LibraryError::Aggregate { .. } => StatusCode::BAD_GATEWAY,
        LibraryError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        LibraryError::InvalidPath(_) | LibraryError::Storage(_) | LibraryError::Render(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<LibraryError> for ErrorResponse {
    fn from(error: LibraryError) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}

pub fn library_error(error: LibraryError) -> ApiError {
    (status_for(&error), Json(ErrorResponse::from(error)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlibrary_core::MediaKind;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&LibraryError::NotFound("movie 1".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&LibraryError::VideoRemoved {
                kind: MediaKind::Movie,
                id: 1
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&LibraryError::ShuttingDown),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&LibraryError::Storage("locked".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
