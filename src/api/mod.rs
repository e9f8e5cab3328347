pub mod admin;
pub mod public;

use axum::{middleware::from_fn, response::Response, routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::context::AppContext;
use crate::middleware::logging::{logging_middleware, to_response};
use admin::admin_api_router;
use public::public_api_router;

pub fn create_api_router(ctx: AppContext) -> Router {
    let api = Router::new()
        .merge(public_api_router(ctx.clone()))
        .merge(admin_api_router(ctx.clone()));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(ctx.request_timeout))
}

async fn health() -> Response {
    to_response("ok", Ok(()))
}
