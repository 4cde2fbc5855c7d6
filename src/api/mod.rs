/// API routes and handlers
pub mod agent;
pub mod middleware;
pub mod server;
pub mod thing;
pub mod track;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(server::routes())
        .merge(agent::routes())
        .merge(thing::routes())
        .merge(track::routes())
}
