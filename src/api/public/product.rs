use axum::{extract::Extension, http::StatusCode, response::Response, routing::get, Json, Router};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, QueryOrder};
use serde::Serialize;

use crate::context::AppContext;
use crate::entities::product::{self, Entity as ProductEntity};
use crate::error::ApiError;
use crate::middleware::logging::to_response;
use crate::money;

pub fn product_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/products", get(get_products))
        .layer(Extension(ctx))
}

async fn get_products(Extension(ctx): Extension<AppContext>) -> Result<Response, ApiError> {
    let products = ProductEntity::find()
        .order_by_desc(product::Column::Id)
        .all(ctx.db.as_ref())
        .await?;

    let response: Vec<ProductResponse> = products.into_iter().map(ProductResponse::new).collect();
    Ok(to_response((StatusCode::OK, Json(response)), Ok(())))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub image_key: Option<String>,
    pub category: Option<String>,
}

impl ProductResponse {
    pub fn new(value: product::Model) -> ProductResponse {
        ProductResponse {
            id: value.id,
            name: value.name,
            price: money::from_cents(value.price_cents),
            image_key: value.image_key,
            category: value.category,
        }
    }
}
