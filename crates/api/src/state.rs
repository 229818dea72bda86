use std::sync::Arc;

use crate::config::ServerConfig;
use crate::store::VisitStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// In-memory record store.
    pub store: Arc<VisitStore>,
    /// Server configuration (admin credential lookup).
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            store: Arc::new(VisitStore::new()),
            config: Arc::new(config),
        }
    }
}
