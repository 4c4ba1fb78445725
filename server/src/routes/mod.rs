//! HTTP route definitions.

mod games;
mod health;
mod merge;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(games::routes())
        .merge(merge::routes())
}
