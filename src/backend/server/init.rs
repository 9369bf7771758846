/**
 * Server Initialization
 *
 * 1. Open the message store
 * 2. Build the registry, bus, gateway and history service (`AppState`)
 * 3. Assemble the router
 */

use axum::Router;

use crate::backend::routes::router::create_router;
use crate::backend::server::config::load_store;
use crate::backend::server::state::AppState;
use crate::shared::AppConfig;

/// Create the application state from configuration
pub async fn build_state(config: AppConfig) -> AppState {
    let store = load_store(&config).await;
    AppState::new(config, store)
}

/// Create and configure the Axum application
pub async fn create_app(config: AppConfig) -> Router<()> {
    tracing::info!("Initializing chatsync server");
    let state = build_state(config).await;
    let app = create_router(state);
    tracing::info!("Router configured");
    app
}
