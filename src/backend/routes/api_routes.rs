/**
 * API Routes
 *
 * - `GET    /api/messages`      - paged history
 * - `POST   /api/messages`      - create a message
 * - `PATCH  /api/messages/{id}` - edit a message
 * - `DELETE /api/messages/{id}` - soft-delete a message
 */

use axum::routing::{get, patch};
use axum::Router;

use crate::backend::messaging::handlers::{create_message, delete_message, get_messages, update_message};
use crate::backend::server::state::AppState;

/// Add the message API to `router`
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/messages", get(get_messages).post(create_message))
        .route("/api/messages/{id}", patch(update_message).delete(delete_message))
}
