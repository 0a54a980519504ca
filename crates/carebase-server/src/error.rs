//! HTTP error contract.
//!
//! Every failure leaves the server as `{"status": "error", "message": ...}`.
//! A refused billing additionally lists the undocumented tours and shifts
//! under `missing`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use carebase_core::{CareError, MissingDocumentation};
use carebase_llm::AssistantError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{} tour(s) or shift(s) in the period lack documentation", .0.len())]
    MissingDocumentation(Vec<MissingDocumentation>),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::MissingDocumentation(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// AI failure on an endpoint that exists only for the AI output.
    pub fn ai(what: &str, e: AssistantError) -> Self {
        ApiError::Unavailable(format!("could not generate {}: {}", what, e))
    }
}

impl From<CareError> for ApiError {
    fn from(e: CareError) -> Self {
        match e {
            CareError::NotFound(what) => ApiError::NotFound(format!("Not found: {}", what)),
            CareError::InvalidInput(msg) => ApiError::BadRequest(msg),
            CareError::Conflict(msg) => ApiError::Conflict(msg),
            CareError::MissingDocumentation(missing) => ApiError::MissingDocumentation(missing),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(e: AssistantError) -> Self {
        ApiError::Unavailable(e.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("background task failed: {}", e))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self, "request failed");
        }

        let body = match self {
            ApiError::MissingDocumentation(missing) => json!({
                "status": "error",
                "message": format!(
                    "{} tour(s) or shift(s) in the period lack documentation",
                    missing.len()
                ),
                "missing": missing,
            }),
            other => json!({
                "status": "error",
                "message": other.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// JSON body whose rejection follows the error contract.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejection follows the error contract.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters whose rejection follows the error contract.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use carebase_core::DocumentedKind;

    #[test]
    fn test_care_errors_map_to_status_codes() {
        let cases = [
            (CareError::NotFound("patient x".into()), StatusCode::NOT_FOUND),
            (CareError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (CareError::Conflict("taken".into()), StatusCode::CONFLICT),
            (CareError::Database("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (CareError::Lock("poisoned".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (care, expected) in cases {
            assert_eq!(ApiError::from(care).status(), expected);
        }
    }

    #[test]
    fn test_missing_documentation_is_conflict() {
        let missing = vec![MissingDocumentation {
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            kind: DocumentedKind::Tour,
            id: "t1".into(),
        }];
        let err = ApiError::from(CareError::MissingDocumentation(missing));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.to_string().starts_with("1 tour(s)"));
    }

    #[test]
    fn test_assistant_errors_are_unavailable() {
        let err = ApiError::ai("summary", AssistantError::Unavailable("no key".into()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.to_string().starts_with("could not generate summary"));
    }
}
