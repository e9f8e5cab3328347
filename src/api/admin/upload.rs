use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::context::AppContext;
use crate::error::ApiError;
use crate::middleware::logging::to_response;
use crate::services::storage::object_key;

pub fn upload_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/upload/presigned-url", post(presigned_url))
        .layer(Extension(ctx))
}

async fn presigned_url(
    Extension(ctx): Extension<AppContext>,
    payload: Result<Json<PresignPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    if payload.validate().is_err() {
        return Err(ApiError::Validation(
            "filename and contentType are required".into(),
        ));
    }

    let signer = ctx
        .uploads
        .as_ref()
        .ok_or_else(|| ApiError::Internal("upload signing key is not configured".into()))?;

    let key = object_key(&payload.filename, Utc::now().timestamp_millis());
    let upload_url = signer
        .presign_put(&key, &payload.content_type, ctx.upload_ttl)
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(to_response(
        (
            StatusCode::OK,
            Json(PresignResponse {
                ok: true,
                public_url: signer.public_url(&key),
                upload_url,
                key,
            }),
        ),
        Ok(()),
    ))
}

//Structs
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PresignPayload {
    #[serde(default)]
    #[validate(length(min = 1))]
    filename: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    content_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PresignResponse {
    ok: bool,
    upload_url: String,
    key: String,
    public_url: String,
}
