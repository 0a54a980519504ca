//! Shift templates, preferences and change requests.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use carebase_core::models::{
    ChangeRequestStatus, NewShiftChangeRequest, NewShiftTemplate, Shift, ShiftChangeRequest,
    ShiftPreference, ShiftPreferenceInput, ShiftTemplate,
};
use carebase_core::ChangeRequestOutcome;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shift-templates", get(list_templates).post(create_template))
        .route("/shift-templates/:id", get(read_template).delete(delete_template))
        .route("/shift-templates/:id/apply", post(apply_template))
        .route("/shift-preferences", get(list_preferences))
        .route("/shift-preferences/:employee_id", put(upsert_preference))
        .route("/shift-change-requests", get(list_requests).post(create_request))
        .route("/shift-change-requests/:id/approve", post(approve_request))
        .route("/shift-change-requests/:id/reject", post(reject_request))
}

async fn list_templates(State(state): State<AppState>) -> ApiResult<Json<Vec<ShiftTemplate>>> {
    Ok(Json(state.run(|core| core.list_shift_templates()).await?))
}

async fn create_template(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewShiftTemplate>,
) -> ApiResult<(StatusCode, Json<ShiftTemplate>)> {
    let template = state.run(move |core| core.create_shift_template(input)).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn read_template(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<ShiftTemplate>> {
    Ok(Json(state.run(move |core| core.get_shift_template(&id)).await?))
}

async fn delete_template(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.run(move |core| core.delete_shift_template(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ApplyTemplate {
    employee_id: String,
    from: NaiveDate,
    to: NaiveDate,
}

async fn apply_template(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<ApplyTemplate>,
) -> ApiResult<(StatusCode, Json<Vec<Shift>>)> {
    let shifts = state
        .run(move |core| core.apply_shift_template(&id, &body.employee_id, body.from, body.to))
        .await?;
    info!(created = shifts.len(), "applied shift template");
    Ok((StatusCode::CREATED, Json(shifts)))
}

async fn list_preferences(State(state): State<AppState>) -> ApiResult<Json<Vec<ShiftPreference>>> {
    Ok(Json(state.run(|core| core.list_shift_preferences()).await?))
}

async fn upsert_preference(
    State(state): State<AppState>,
    ApiPath(employee_id): ApiPath<String>,
    ApiJson(input): ApiJson<ShiftPreferenceInput>,
) -> ApiResult<Json<ShiftPreference>> {
    Ok(Json(
        state
            .run(move |core| core.upsert_shift_preference(&employee_id, input))
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct RequestFilter {
    status: Option<ChangeRequestStatus>,
}

async fn list_requests(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<RequestFilter>,
) -> ApiResult<Json<Vec<ShiftChangeRequest>>> {
    Ok(Json(
        state
            .run(move |core| core.list_change_requests(filter.status))
            .await?,
    ))
}

async fn create_request(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewShiftChangeRequest>,
) -> ApiResult<(StatusCode, Json<ShiftChangeRequest>)> {
    let request = state.run(move |core| core.create_change_request(input)).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn approve_request(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<ChangeRequestOutcome>> {
    Ok(Json(state.run(move |core| core.approve_change_request(&id)).await?))
}

async fn reject_request(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<ChangeRequestOutcome>> {
    Ok(Json(state.run(move |core| core.reject_change_request(&id)).await?))
}
