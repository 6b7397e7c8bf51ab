use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::ApiState;

pub fn create_router(state: Arc<ApiState>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    Router::new()
        .route("/api/quota/events", post(handlers::apply_event))
        .route("/api/quota/buckets/:bucket_id", get(handlers::bucket_counters))
        .route(
            "/api/quota/buckets/:bucket_id/collections/:collection_id",
            get(handlers::collection_counters),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state)
        .layer(middleware)
}
