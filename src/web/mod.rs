use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::services::gateway::ActivityGateway;
use crate::services::in_flight::InFlightRegistry;

pub mod middleware;
pub mod routes;

/// Shared by every handler. The pool only backs the signed-in fallback and,
/// in local mode, the gateway itself.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn ActivityGateway>,
    pub in_flight: InFlightRegistry,
    pub pool: SqlitePool,
}

impl AppState {
    pub fn new(gateway: Arc<dyn ActivityGateway>, pool: SqlitePool) -> Self {
        Self {
            gateway,
            in_flight: InFlightRegistry::new(),
            pool,
        }
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
