use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::types::Uuid;
use thiserror::Error;

use crate::db::{SessionStatus, StoreError};

/// Scheduling failure taxonomy. Every variant except `Store` is recoverable
/// by the caller.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("practitioner is not available on this day")]
    ProviderUnavailable,

    #[error("selected time is outside the practitioner's working hours")]
    OutsideWorkingHours,

    #[error("this time slot is already booked")]
    SlotConflict,

    #[error("invalid availability window: {0}")]
    InvalidRange(String),

    #[error("operation not permitted while session is {0}")]
    InvalidStateTransition(SessionStatus),

    #[error("session not found: {0}")]
    NotFound(Uuid),

    #[error("reminder could not be delivered to either party")]
    DeliveryFailed,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Schedule(ref err) => match err {
                ScheduleError::ProviderUnavailable => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "Practitioner unavailable")
                }
                ScheduleError::OutsideWorkingHours => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "Outside working hours")
                }
                ScheduleError::SlotConflict => (StatusCode::CONFLICT, "Slot already booked"),
                ScheduleError::InvalidRange(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "Invalid availability window")
                }
                ScheduleError::InvalidStateTransition(_) => {
                    (StatusCode::CONFLICT, "Invalid session state")
                }
                ScheduleError::NotFound(_) => (StatusCode::NOT_FOUND, "Resource not found"),
                ScheduleError::DeliveryFailed => {
                    (StatusCode::BAD_GATEWAY, "Notification delivery failed")
                }
                ScheduleError::Store(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred",
                ),
            },
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "details": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
