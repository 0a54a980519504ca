//! Patient routes, including the assistant-backed summary, care prediction
//! and document extraction.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use carebase_core::models::{NewPatient, Patient, PatientPatch};
use carebase_llm::{CarePrediction, ExtractedPatient, ImageInput};
use serde::Serialize;
use tracing::info;

use crate::ai;
use crate::error::{ApiError, ApiJson, ApiPath, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/patients", get(list).post(create))
        .route("/patients/extract", post(extract))
        .route("/patients/:id", get(read).patch(update).delete(remove))
        .route("/patients/:id/summary", get(summary))
        .route("/patients/:id/care-prediction", get(care_prediction))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Patient>>> {
    Ok(Json(state.run(|core| core.list_patients()).await?))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewPatient>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    let patient = state.run(move |core| core.create_patient(input)).await?;
    info!(patient_id = %patient.id, "created patient");
    Ok((StatusCode::CREATED, Json(patient)))
}

async fn read(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<Json<Patient>> {
    Ok(Json(state.run(move |core| core.get_patient(&id)).await?))
}

async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<PatientPatch>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(state.run(move |core| core.update_patient(&id, patch)).await?))
}

async fn remove(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<StatusCode> {
    state.run(move |core| core.delete_patient(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct Summary {
    patient_id: String,
    summary: String,
}

async fn summary(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<Json<Summary>> {
    let snapshot = ai::patient_snapshot(&state, &id).await?;
    let summary = state
        .assistant
        .summarize_patient(&snapshot)
        .await
        .map_err(|e| ApiError::ai("a patient summary", e))?;
    Ok(Json(Summary {
        patient_id: id,
        summary,
    }))
}

async fn care_prediction(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<CarePrediction>> {
    let snapshot = ai::patient_snapshot(&state, &id).await?;
    let prediction = state
        .assistant
        .predict_care_needs(&snapshot)
        .await
        .map_err(|e| ApiError::ai("a care prediction", e))?;
    Ok(Json(prediction))
}

/// Read patient details from a scanned form.
async fn extract(
    State(state): State<AppState>,
    ApiJson(image): ApiJson<ImageInput>,
) -> ApiResult<Json<ExtractedPatient>> {
    if image.data_base64.trim().is_empty() {
        return Err(ApiError::BadRequest("image data is empty".into()));
    }
    if !image.mime_type.starts_with("image/") {
        return Err(ApiError::BadRequest(format!(
            "expected an image, got {}",
            image.mime_type
        )));
    }
    let extracted = state
        .assistant
        .extract_patient_data(&image)
        .await
        .map_err(|e| ApiError::ai("patient data from the image", e))?;
    Ok(Json(extracted))
}
