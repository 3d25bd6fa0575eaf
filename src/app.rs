use axum::{middleware, routing::get, Json, Router};
use serde_json::json;
use time::format_description::well_known::Rfc3339;

use crate::{
    app_state::AppState,
    middleware::tracing::observability_middleware,
    modules::availability::routes::availability_routes,
    modules::sessions::routes::session_routes,
    websocket::websocket_routes,
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .merge(availability_routes())
        .merge(session_routes())
        .merge(websocket_routes())
        .layer(middleware::from_fn(observability_middleware))
        .with_state(state)
}

async fn hello() -> &'static str {
    "Mindwell scheduling backend says hello!\n"
}

async fn health_check() -> Json<serde_json::Value> {
    let timestamp = time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(json!({
        "status": "ok",
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
