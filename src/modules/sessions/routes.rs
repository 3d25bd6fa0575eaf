use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    available_slots, book_session, cancel_session, client_sessions, practitioner_sessions,
    reschedule_session, trigger_reminder,
};
use crate::app_state::AppState;

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(book_session))
        .route("/sessions/{id}/reschedule", post(reschedule_session))
        .route("/sessions/{id}/cancel", post(cancel_session))
        .route("/sessions/{id}/reminder", post(trigger_reminder))
        .route("/practitioners/{id}/slots", get(available_slots))
        .route("/practitioners/{id}/sessions", get(practitioner_sessions))
        .route("/clients/{id}/sessions", get(client_sessions))
}
