//! HTTP router construction.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::state::AppState;

pub const PLANNER_PATH: &str = "/space/collections/collection/planner";

/// Build the application router. CORS preflights are answered by the layer;
/// bare `OPTIONS` requests on the planner path reach [`api::planner_options`].
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health))
        .route(PLANNER_PATH, get(api::planner).options(api::planner_options))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
