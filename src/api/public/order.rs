use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::entities::order::Status;
use crate::error::ApiError;
use crate::middleware::logging::to_response;
use crate::services::{
    checkout::{place_order, CheckoutRequest},
    orders::{find_order, update_status, OrderDetails},
};

pub fn order_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", patch(patch_status))
        .layer(Extension(ctx))
}

async fn create_order(
    Extension(ctx): Extension<AppContext>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let receipt = place_order(ctx.db.as_ref(), ctx.notifier.as_ref(), request).await?;
    Ok(to_response((StatusCode::OK, Json(receipt)), Ok(())))
}

async fn get_order(
    Path(id): Path<i32>,
    Extension(ctx): Extension<AppContext>,
) -> Result<Response, ApiError> {
    let order = find_order(ctx.db.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {id} not found")))?;
    Ok(to_response(
        (StatusCode::OK, Json(OrderResponse { ok: true, order })),
        Ok(()),
    ))
}

async fn patch_status(
    Path(id): Path<i32>,
    Extension(ctx): Extension<AppContext>,
    payload: Result<Json<PatchStatus>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let status = update_status(ctx.db.as_ref(), id, payload.status.as_deref().unwrap_or_default())
        .await?;
    Ok(to_response(
        (
            StatusCode::OK,
            Json(StatusResponse {
                ok: true,
                order_id: id,
                status,
            }),
        ),
        Ok(()),
    ))
}

//Structs
#[derive(Deserialize)]
struct PatchStatus {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Serialize)]
struct OrderResponse {
    ok: bool,
    order: OrderDetails,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    ok: bool,
    order_id: i32,
    status: Status,
}
