use axum::extract::{Path, State};
use axum::Json;
use sqlx::types::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::{AvailabilityWindow, UpsertAvailability};
use crate::error::AppResult;

pub async fn set_availability(
    State(state): State<AppState>,
    Path(practitioner_id): Path<Uuid>,
    Json(payload): Json<UpsertAvailability>,
) -> AppResult<Json<AvailabilityWindow>> {
    payload.validate()?;
    let window = state
        .availability
        .set_window(practitioner_id, payload)
        .await?;
    Ok(Json(window))
}

pub async fn list_availability(
    State(state): State<AppState>,
    Path(practitioner_id): Path<Uuid>,
) -> AppResult<Json<Vec<AvailabilityWindow>>> {
    let windows = state.availability.list_windows(practitioner_id).await?;
    Ok(Json(windows))
}
