//! Tour routes. Every change that moves tours is announced on the
//! real-time channel.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use carebase_core::models::{NewTour, Tour, TourFilter, TourMutation, TourPatch};
use serde::Deserialize;
use tracing::info;

use crate::ai::{self, OptimizeOutcome};
use crate::error::{ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tours", get(list).post(create))
        .route("/tours/:id", get(read).patch(update).delete(remove))
        .route("/tours/:id/patients", post(add_patient))
        .route("/tours/:id/patients/:patient_id", delete(remove_patient))
        .route("/tours/:id/optimize", post(optimize))
}

/// Tell connected clients about the edited tour and every tour it pushed.
fn announce(state: &AppState, mutation: &TourMutation) {
    state.hub.tours_updated(
        None,
        std::iter::once(&mutation.tour.id).chain(&mutation.shifted_tour_ids),
    );
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<TourFilter>,
) -> ApiResult<Json<Vec<Tour>>> {
    Ok(Json(state.run(move |core| core.list_tours(&filter)).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewTour>,
) -> ApiResult<(StatusCode, Json<TourMutation>)> {
    let mutation = state.run(move |core| core.create_tour(input)).await?;
    announce(&state, &mutation);
    Ok((StatusCode::CREATED, Json(mutation)))
}

async fn read(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<Json<Tour>> {
    Ok(Json(state.run(move |core| core.get_tour(&id)).await?))
}

async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<TourPatch>,
) -> ApiResult<Json<TourMutation>> {
    let mutation = state.run(move |core| core.update_tour(&id, patch)).await?;
    announce(&state, &mutation);
    Ok(Json(mutation))
}

async fn remove(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<StatusCode> {
    let tour_id = id.clone();
    state.run(move |core| core.delete_tour(&id)).await?;
    state.hub.tours_updated(None, [&tour_id]);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AddPatient {
    patient_id: String,
    /// Index to insert at; appended when absent or past the end
    position: Option<usize>,
}

async fn add_patient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<AddPatient>,
) -> ApiResult<Json<TourMutation>> {
    let mutation = state
        .run(move |core| core.add_patient_to_tour(&id, &body.patient_id, body.position))
        .await?;
    announce(&state, &mutation);
    Ok(Json(mutation))
}

async fn remove_patient(
    State(state): State<AppState>,
    ApiPath((id, patient_id)): ApiPath<(String, String)>,
) -> ApiResult<Json<TourMutation>> {
    let mutation = state
        .run(move |core| core.remove_patient_from_tour(&id, &patient_id))
        .await?;
    announce(&state, &mutation);
    Ok(Json(mutation))
}

/// Reorder the tour with the assistant's suggestion. An unusable
/// suggestion still answers 200 with the unchanged tour and a message.
async fn optimize(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<OptimizeOutcome>> {
    let outcome = ai::optimize_tour(&state, &id).await?;
    if outcome.applied {
        state.hub.tours_updated(
            None,
            std::iter::once(&outcome.tour.id).chain(&outcome.shifted_tour_ids),
        );
    } else {
        info!(tour_id = %id, "tour order kept");
    }
    Ok(Json(outcome))
}
