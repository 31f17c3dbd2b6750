use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, library, middleware::metrics_middleware, refresh};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Movies
        .route("/movies/{id}", post(library::add_movie))
        .route("/movies/{id}", delete(library::remove_movie))
        // Shows and episodes
        .route("/shows/{id}", post(library::add_show))
        .route("/shows/{id}", delete(library::remove_show))
        .route("/shows/{id}/update", post(library::update_show))
        .route(
            "/shows/{id}/episodes/{episode_id}",
            delete(library::remove_episode),
        )
        // Remote lists
        .route("/sync/{kind}/{list}", post(library::sync_list))
        // Ledger and cache
        .route("/items", get(library::list_items))
        .route("/cache", delete(library::clear_cache))
        // Refresh coordinator
        .route("/refresh", get(refresh::get_status))
        .route("/refresh/{kind}", post(refresh::request_refresh));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
