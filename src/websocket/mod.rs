mod ws_handler;
mod routes;

pub use routes::websocket_routes;
pub use ws_handler::ws_handler;
