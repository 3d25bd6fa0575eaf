use axum::{routing::put, Router};

use super::handlers::{list_availability, set_availability};
use crate::app_state::AppState;

pub fn availability_routes() -> Router<AppState> {
    Router::new().route(
        "/practitioners/{id}/availability",
        put(set_availability).get(list_availability),
    )
}
