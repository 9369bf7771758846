/**
 * Application State Management
 *
 * `AppState` holds every long-lived service of the server. Handlers extract
 * only the part they need through the `FromRef` implementations below.
 *
 * There are no process-wide singletons: the registry, the bus and the
 * store are created once in `init` and shared by `Arc`.
 */

use axum::extract::FromRef;
use std::sync::Arc;

use crate::backend::messaging::{HistoryService, MutationGateway, RetryPolicy};
use crate::backend::middleware::auth::TokenVerifier;
use crate::backend::realtime::{ConnectionRegistry, EventBus};
use crate::backend::store::MessageStore;
use crate::shared::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    /// Persistence boundary
    pub store: Arc<dyn MessageStore>,

    /// Event fan-out; owns the connection registry
    pub bus: Arc<EventBus>,

    /// Create / edit / delete entry point
    pub gateway: Arc<MutationGateway>,

    /// Paged history reads
    pub history: Arc<HistoryService>,

    pub verifier: TokenVerifier,
}

impl AppState {
    /// Wire every service around `store`
    pub fn new(config: AppConfig, store: Arc<dyn MessageStore>) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(ConnectionRegistry::new(config.connection_buffer));
        let bus = Arc::new(EventBus::new(registry));
        let gateway = Arc::new(MutationGateway::new(
            store.clone(),
            bus.clone(),
            RetryPolicy::from_settings(&config.retry),
        ));
        let history = Arc::new(HistoryService::new(store.clone(), config.clone()));
        let verifier = TokenVerifier::new(&config.jwt_secret);

        Self {
            config,
            store,
            bus,
            gateway,
            history,
            verifier,
        }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn MessageStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for Arc<EventBus> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.bus.clone()
    }
}

impl FromRef<AppState> for Arc<MutationGateway> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.gateway.clone()
    }
}

impl FromRef<AppState> for Arc<HistoryService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.history.clone()
    }
}

/// Lets `MaybeIdentity` verify tokens
impl FromRef<AppState> for TokenVerifier {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.verifier.clone()
    }
}
