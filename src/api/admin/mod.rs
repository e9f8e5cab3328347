pub mod product;
pub mod upload;

use axum::{middleware::from_fn_with_state, Router};

use crate::context::AppContext;
use crate::middleware::auth::require_admin;
use product::admin_product_router;
use upload::upload_router;

pub fn admin_api_router(ctx: AppContext) -> Router {
    let admin_product_router = admin_product_router(ctx.clone());
    let upload_router = upload_router(ctx.clone());

    Router::new()
        .merge(admin_product_router)
        .merge(upload_router)
        .route_layer(from_fn_with_state(ctx.auth.clone(), require_admin))
}
