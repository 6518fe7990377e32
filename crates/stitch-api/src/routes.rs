//! API routes.

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    add_to_queue, clear_queue, download_output, get_queue, get_status, health, submit_merge,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let queue_routes = Router::new()
        .route("/queue/add", post(add_to_queue))
        .route("/queue/clear", post(clear_queue))
        .route("/queue", get(get_queue));

    let job_routes = Router::new()
        .route("/merge", post(submit_merge))
        .route("/status/:job_id", get(get_status))
        .route("/download/:job_id", get(download_output));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));

    Router::new()
        .merge(queue_routes)
        .merge(job_routes)
        .merge(health_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}
