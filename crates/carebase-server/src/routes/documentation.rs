//! Care documentation routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use carebase_core::models::{Documentation, DocumentationPatch, DocumentationStatus, NewDocumentation};
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::realtime::ServerMessage;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/documentation", get(list).post(create))
        .route("/documentation/:id", get(read).patch(update).delete(remove))
        .route("/documentation/:id/status", post(set_status))
}

#[derive(Debug, Deserialize)]
struct ByPatient {
    patient_id: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ByPatient>,
) -> ApiResult<Json<Vec<Documentation>>> {
    Ok(Json(
        state
            .run(move |core| core.list_documentation(query.patient_id.as_deref()))
            .await?,
    ))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewDocumentation>,
) -> ApiResult<(StatusCode, Json<Documentation>)> {
    let doc = state.run(move |core| core.create_documentation(input)).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn read(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Documentation>> {
    Ok(Json(state.run(move |core| core.get_documentation(&id)).await?))
}

async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<DocumentationPatch>,
) -> ApiResult<Json<Documentation>> {
    Ok(Json(
        state
            .run(move |core| core.update_documentation(&id, patch))
            .await?,
    ))
}

async fn remove(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<StatusCode> {
    state.run(move |core| core.delete_documentation(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: DocumentationStatus,
}

async fn set_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(change): ApiJson<StatusChange>,
) -> ApiResult<Json<Documentation>> {
    let doc = state
        .run(move |core| core.set_documentation_status(&id, change.status))
        .await?;
    info!(documentation_id = %doc.id, status = doc.status.as_str(), "documentation status changed");
    state.hub.publish(
        None,
        ServerMessage::DocStatusUpdated {
            documentation_id: doc.id.clone(),
            status: doc.status,
        },
    );
    Ok(Json(doc))
}
