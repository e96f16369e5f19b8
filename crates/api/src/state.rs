use std::sync::Arc;

use obra_events::NotificationDispatcher;
use obra_gallery::ProjectFeed;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: inner data is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: obra_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Admin push notification fan-out.
    pub dispatcher: NotificationDispatcher,
    /// Public gallery feed.
    pub feed: Arc<ProjectFeed>,
}
