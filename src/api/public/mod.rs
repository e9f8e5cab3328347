pub mod order;
pub mod product;

use axum::Router;

use crate::context::AppContext;
use order::order_router;
use product::product_router;

pub fn public_api_router(ctx: AppContext) -> Router {
    Router::new()
        .merge(product_router(ctx.clone()))
        .merge(order_router(ctx))
}
