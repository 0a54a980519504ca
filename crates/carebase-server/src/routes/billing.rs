//! Insurance billing routes: the documentation gate, suggestions, text
//! enhancement and export.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use carebase_core::models::{BillingPatch, BillingService, BillingStatus, InsuranceBilling, NewBilling};
use carebase_core::MissingDocumentation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/billings", get(list).post(create))
        .route("/billings/missing-documentation", get(missing_documentation))
        .route("/billings/suggest", get(suggest))
        .route("/billings/enhance", post(enhance))
        .route("/billings/export", get(export_all))
        .route("/billings/:id", get(read).patch(update).delete(remove))
        .route("/billings/:id/status", post(set_status))
        .route("/billings/:id/export", get(export_one))
}

#[derive(Debug, Deserialize)]
struct ByPatient {
    patient_id: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ByPatient>,
) -> ApiResult<Json<Vec<InsuranceBilling>>> {
    Ok(Json(
        state
            .run(move |core| core.list_billings(query.patient_id.as_deref()))
            .await?,
    ))
}

/// Refused with 409 and the undocumented visits unless `force` is set.
async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewBilling>,
) -> ApiResult<(StatusCode, Json<InsuranceBilling>)> {
    let billing = state.run(move |core| core.create_billing(input)).await?;
    Ok((StatusCode::CREATED, Json(billing)))
}

async fn read(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<InsuranceBilling>> {
    Ok(Json(state.run(move |core| core.get_billing(&id)).await?))
}

async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<BillingPatch>,
) -> ApiResult<Json<InsuranceBilling>> {
    Ok(Json(state.run(move |core| core.update_billing(&id, patch)).await?))
}

async fn remove(State(state): State<AppState>, ApiPath(id): ApiPath<String>) -> ApiResult<StatusCode> {
    state.run(move |core| core.delete_billing(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: BillingStatus,
}

async fn set_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(change): ApiJson<StatusChange>,
) -> ApiResult<Json<InsuranceBilling>> {
    Ok(Json(
        state
            .run(move |core| core.set_billing_status(&id, change.status))
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct PatientPeriod {
    patient_id: String,
    from: NaiveDate,
    to: NaiveDate,
}

async fn missing_documentation(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PatientPeriod>,
) -> ApiResult<Json<Vec<MissingDocumentation>>> {
    Ok(Json(
        state
            .run(move |core| core.missing_documentation(&query.patient_id, query.from, query.to))
            .await?,
    ))
}

async fn suggest(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PatientPeriod>,
) -> ApiResult<Json<Vec<BillingService>>> {
    Ok(Json(
        state
            .run(move |core| core.suggest_billing_services(&query.patient_id, query.from, query.to))
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct EnhanceRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct EnhanceResponse {
    text: String,
    enhanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Polish a billing description. Without the assistant the text comes back
/// unchanged with a message.
async fn enhance(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EnhanceRequest>,
) -> ApiResult<Json<EnhanceResponse>> {
    if body.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text is empty".into()));
    }

    let response = match state.assistant.enhance_billing_text(&body.text).await {
        Ok(text) => EnhanceResponse {
            text,
            enhanced: true,
            message: None,
        },
        Err(e) => {
            warn!(error = %e, "billing text enhancement unavailable");
            EnhanceResponse {
                text: body.text,
                enhanced: false,
                message: Some(format!("could not generate an improved billing text: {}", e)),
            }
        }
    };
    Ok(Json(response))
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    #[serde(default)]
    format: ExportFormat,
    status: Option<BillingStatus>,
}

fn csv_response(csv: String) -> Response {
    ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response()
}

fn json_response(json: Result<String, serde_json::Error>) -> ApiResult<Response> {
    let body = json.map_err(|e| ApiError::Internal(format!("could not encode export: {}", e)))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn export_all(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> ApiResult<Response> {
    let status = query.status;
    let export = state.run(move |core| core.export_billings(status)).await?;
    info!(
        billings = export.billings.len(),
        items = export.total_items,
        "exported billings"
    );
    match query.format {
        ExportFormat::Csv => Ok(csv_response(export.to_csv())),
        ExportFormat::Json => json_response(export.to_json()),
    }
}

#[derive(Debug, Deserialize)]
struct FormatQuery {
    #[serde(default)]
    format: ExportFormat,
}

async fn export_one(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiQuery(query): ApiQuery<FormatQuery>,
) -> ApiResult<Response> {
    let export = state.run(move |core| core.export_billing(&id)).await?;
    match query.format {
        ExportFormat::Csv => Ok(csv_response(export.to_csv())),
        ExportFormat::Json => json_response(export.to_json()),
    }
}
