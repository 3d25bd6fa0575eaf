use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::types::Uuid;
use time::{Date, Time};
use validator::Validate;

use crate::app_state::AppState;
use crate::db::{BookSession, CancelSession, RescheduleSession, Session};
use crate::error::AppResult;

pub async fn book_session(
    State(state): State<AppState>,
    Json(payload): Json<BookSession>,
) -> AppResult<(StatusCode, Json<Session>)> {
    payload.validate()?;
    let session = state.sessions.book(payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn reschedule_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<RescheduleSession>,
) -> AppResult<Json<Session>> {
    payload.validate()?;
    let session = state.sessions.reschedule(session_id, payload).await?;
    Ok(Json(session))
}

pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<CancelSession>,
) -> AppResult<Json<Session>> {
    payload.validate()?;
    let session = state.sessions.cancel(session_id, payload).await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: Date,
}

pub async fn available_slots(
    State(state): State<AppState>,
    Path(practitioner_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> AppResult<Json<Vec<Time>>> {
    let slots = state
        .sessions
        .available_slots(practitioner_id, query.date)
        .await?;
    Ok(Json(slots))
}

pub async fn practitioner_sessions(
    State(state): State<AppState>,
    Path(practitioner_id): Path<Uuid>,
) -> AppResult<Json<Vec<Session>>> {
    let sessions = state.sessions.sessions_for_practitioner(practitioner_id).await?;
    Ok(Json(sessions))
}

pub async fn client_sessions(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Vec<Session>>> {
    let sessions = state.sessions.sessions_for_client(client_id).await?;
    Ok(Json(sessions))
}

pub async fn trigger_reminder(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    state.sweeper.trigger_reminder(session_id).await?;
    Ok(Json(json!({ "status": "sent", "session_id": session_id })))
}
