/**
 * Router Configuration
 *
 * Combines the message API, the realtime websocket endpoint and a health
 * check into one router, with request tracing on every route.
 */

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::backend::realtime::handle_ws_upgrade;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
///
/// - `GET /health` - liveness
/// - `GET /ws` - realtime websocket (token in header or `?token=`)
/// - `/api/messages` - see `api_routes`
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new()
        .route("/health", get(health))
        .route("/ws", get(handle_ws_upgrade));

    configure_api_routes(router)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health() -> &'static str {
    "ok"
}
