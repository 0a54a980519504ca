//! Shift routes with conflict checks and schedule suggestions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use carebase_core::models::{ConflictQuery, ConflictReport, NewShift, Shift, ShiftFilter, ShiftPatch};
use carebase_llm::ScheduleSuggestion;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::ai;
use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shifts", get(list).post(create))
        .route("/shifts/conflicts", post(conflicts))
        .route("/shifts/optimize", post(optimize))
        .route("/shifts/:id", get(read).patch(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ShiftFilter>,
) -> ApiResult<Json<Vec<Shift>>> {
    Ok(Json(state.run(move |core| core.list_shifts(&filter)).await?))
}

/// Conflicts are advisory: the shift is stored with its `conflict_info`.
async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewShift>,
) -> ApiResult<(StatusCode, Json<Shift>)> {
    let shift = state.run(move |core| core.create_shift(input)).await?;
    info!(shift_id = %shift.id, conflict = shift.conflict_info.is_some(), "created shift");
    Ok((StatusCode::CREATED, Json(shift)))
}

async fn read(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<Json<Shift>> {
    Ok(Json(state.run(move |core| core.get_shift(&id)).await?))
}

async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<ShiftPatch>,
) -> ApiResult<Json<Shift>> {
    Ok(Json(state.run(move |core| core.update_shift(&id, patch)).await?))
}

async fn remove(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<StatusCode> {
    state.run(move |core| core.delete_shift(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Dry run: report what a shift would conflict with, store nothing.
async fn conflicts(
    State(state): State<AppState>,
    ApiJson(query): ApiJson<ConflictQuery>,
) -> ApiResult<Json<ConflictReport>> {
    Ok(Json(state.run(move |core| core.check_shift_conflicts(query)).await?))
}

#[derive(Debug, Deserialize)]
struct SchedulePeriod {
    from: NaiveDate,
    to: NaiveDate,
}

async fn optimize(
    State(state): State<AppState>,
    ApiJson(period): ApiJson<SchedulePeriod>,
) -> ApiResult<Json<ScheduleSuggestion>> {
    let request = ai::schedule_request(&state, period.from, period.to).await?;
    let suggestion = state
        .assistant
        .suggest_schedule(&request)
        .await
        .map_err(|e| ApiError::ai("a schedule proposal", e))?;
    Ok(Json(suggestion))
}
