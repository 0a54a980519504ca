//! Expiry-tracked inventory routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use carebase_core::models::{ExpiryItem, ExpiryItemPatch, NewExpiryItem};
use serde::Deserialize;

use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expiry-items", get(list).post(create))
        .route("/expiry-items/:id", get(read).patch(update).delete(remove))
}

#[derive(Debug, Deserialize)]
struct ExpiryQuery {
    /// Only items expiring within this many days from today
    within_days: Option<u32>,
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ExpiryQuery>,
) -> ApiResult<Json<Vec<ExpiryItem>>> {
    Ok(Json(
        state
            .run(move |core| core.list_expiry_items(query.within_days))
            .await?,
    ))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewExpiryItem>,
) -> ApiResult<(StatusCode, Json<ExpiryItem>)> {
    let item = state.run(move |core| core.create_expiry_item(input)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn read(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<Json<ExpiryItem>> {
    Ok(Json(state.run(move |core| core.get_expiry_item(&id)).await?))
}

async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<ExpiryItemPatch>,
) -> ApiResult<Json<ExpiryItem>> {
    Ok(Json(
        state
            .run(move |core| core.update_expiry_item(&id, patch))
            .await?,
    ))
}

async fn remove(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<StatusCode> {
    state.run(move |core| core.delete_expiry_item(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
