//! Employee CRUD routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use carebase_core::models::{Employee, EmployeePatch, NewEmployee};
use tracing::info;

use crate::error::{ApiJson, ApiPath, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/employees", get(list).post(create))
        .route("/employees/:id", get(read).patch(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Employee>>> {
    Ok(Json(state.run(|core| core.list_employees()).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewEmployee>,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    let employee = state.run(move |core| core.create_employee(input)).await?;
    info!(employee_id = %employee.id, "created employee");
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn read(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<Json<Employee>> {
    Ok(Json(state.run(move |core| core.get_employee(&id)).await?))
}

async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<EmployeePatch>,
) -> ApiResult<Json<Employee>> {
    Ok(Json(state.run(move |core| core.update_employee(&id, patch)).await?))
}

async fn remove(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<StatusCode> {
    state.run(move |core| core.delete_employee(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
