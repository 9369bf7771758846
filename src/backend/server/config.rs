/**
 * Server Configuration
 *
 * Chooses the message store from the loaded `AppConfig`.
 *
 * # Error Handling
 *
 * A database that cannot be opened or migrated is logged and the server
 * falls back to the in-memory store instead of refusing to start.
 */

use std::sync::Arc;

use crate::backend::store::{InMemoryStore, MessageStore, SqliteStore};
use crate::shared::AppConfig;

/// Open the configured store
///
/// - `database_url` set: a migrated `SqliteStore`
/// - unset, or the database fails to open: an empty `InMemoryStore`
pub async fn load_store(config: &AppConfig) -> Arc<dyn MessageStore> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set. Using the in-memory message store.");
        return Arc::new(InMemoryStore::new());
    };

    tracing::info!("Connecting to database...");
    match SqliteStore::connect(database_url).await {
        Ok(store) => {
            tracing::info!("Database connection pool created successfully");
            Arc::new(store)
        }
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            tracing::warn!("Falling back to the in-memory message store.");
            Arc::new(InMemoryStore::new())
        }
    }
}
