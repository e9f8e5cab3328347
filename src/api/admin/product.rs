use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, Set, SqlErr};
use serde::Deserialize;
use tracing::info;

use crate::api::public::product::ProductResponse;
use crate::context::AppContext;
use crate::entities::product::{self, Entity as ProductEntity};
use crate::error::ApiError;
use crate::middleware::{auth::Identity, logging::to_response};
use crate::money;

//ROUTERS
pub fn admin_product_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", put(replace_product).delete(delete_product))
        .layer(Extension(ctx))
}

//ROUTES
async fn create_product(
    Extension(ctx): Extension<AppContext>,
    identity: Option<Extension<Identity>>,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let fields = payload.validated()?;

    let created = product::ActiveModel {
        name: Set(fields.name),
        price_cents: Set(fields.price_cents),
        image_key: Set(Some(fields.image_key)),
        category: Set(fields.category),
        ..Default::default()
    }
    .insert(ctx.db.as_ref())
    .await?;

    info!(
        product_id = created.id,
        by = ?identity.and_then(|Extension(identity)| identity.email),
        "Product created"
    );
    Ok(to_response(
        (StatusCode::CREATED, Json(ProductResponse::new(created))),
        Ok(()),
    ))
}

async fn replace_product(
    Path(id): Path<i32>,
    Extension(ctx): Extension<AppContext>,
    payload: Result<Json<ProductPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let fields = payload.validated()?;

    let existing = ProductEntity::find_by_id(id)
        .one(ctx.db.as_ref())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))?;

    let mut existing: product::ActiveModel = existing.into();
    existing.name = Set(fields.name);
    existing.price_cents = Set(fields.price_cents);
    existing.image_key = Set(Some(fields.image_key));
    existing.category = Set(fields.category);
    let updated = existing.update(ctx.db.as_ref()).await?;

    Ok(to_response(
        (StatusCode::OK, Json(ProductResponse::new(updated))),
        Ok(()),
    ))
}

async fn delete_product(
    Path(id): Path<i32>,
    Extension(ctx): Extension<AppContext>,
    identity: Option<Extension<Identity>>,
) -> Result<Response, ApiError> {
    let result = ProductEntity::delete_by_id(id)
        .exec(ctx.db.as_ref())
        .await
        .map_err(|err| referenced_or_internal(id, err))?;

    if result.rows_affected == 0 {
        return Err(ApiError::NotFound(format!("product {id} not found")));
    }

    info!(
        product_id = id,
        by = ?identity.and_then(|Extension(identity)| identity.email),
        "Product deleted"
    );
    Ok(to_response(StatusCode::NO_CONTENT, Ok(())))
}

/// Products referenced by placed orders cannot be removed.
fn referenced_or_internal(id: i32, err: DbErr) -> ApiError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            ApiError::Conflict(format!("product {id} is referenced by existing orders"))
        }
        _ => ApiError::from(err),
    }
}

//Structs
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ProductPayload {
    name: Option<String>,
    price: Option<Decimal>,
    image_key: Option<String>,
    category: Option<String>,
}

struct ProductFields {
    name: String,
    price_cents: i64,
    image_key: String,
    category: Option<String>,
}

impl ProductPayload {
    fn validated(self) -> Result<ProductFields, ApiError> {
        let (Some(name), Some(price), Some(image_key)) = (
            self.name.filter(|name| !name.trim().is_empty()),
            self.price,
            self.image_key.filter(|key| !key.trim().is_empty()),
        ) else {
            return Err(ApiError::Validation(
                "name, price and imageKey are required".into(),
            ));
        };

        if price < Decimal::ZERO {
            return Err(ApiError::Validation("price must not be negative".into()));
        }
        let price_cents = money::to_cents(price)
            .ok_or_else(|| ApiError::Validation("price is too large".into()))?;

        Ok(ProductFields {
            name: name.trim().to_owned(),
            price_cents,
            image_key,
            category: self.category,
        })
    }
}
