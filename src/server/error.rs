use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::schedule::SubmitError;
use crate::{Error, ErrorKind};

/// An error on its way out as `{success: false, error}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Generated text that could not be stored.
    pub unsaved_schedule: Option<String>,
}

impl ApiError {
    pub fn status_for(kind: ErrorKind) -> StatusCode {
        match kind {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Provider | ErrorKind::Store | ErrorKind::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let status = Self::status_for(error.kind());
        let message = match error {
            // Client-facing messages are already worded for the caller.
            Error::InvalidInput(message) | Error::NotFound(message) => message,
            other => {
                tracing::error!(error = %other, "request failed");
                other.to_string()
            }
        };

        Self {
            status,
            message,
            unsaved_schedule: None,
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(error: SubmitError) -> Self {
        Self {
            unsaved_schedule: error.unsaved_schedule,
            ..Self::from(error.error)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.unsaved_schedule {
            Some(schedule) => json!({
                "success": false,
                "error": self.message,
                "unsavedSchedule": schedule,
            }),
            None => json!({ "success": false, "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(Error::invalid_input("Prompt is required.")).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(Error::not_found("no record")).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(Error::provider("Gemini", "quota")).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(Error::store("disk full")).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_messages_are_unwrapped() {
        let error = ApiError::from(Error::invalid_input("Prompt is required."));
        assert_eq!(error.message, "Prompt is required.");
    }

    #[test]
    fn test_unsaved_schedule_is_kept() {
        let error = ApiError::from(SubmitError {
            error: Error::store("disk full"),
            unsaved_schedule: Some("| 08:00 | Walk |".to_string()),
        });
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.unsaved_schedule.as_deref(), Some("| 08:00 | Walk |"));
    }
}
