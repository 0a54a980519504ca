//! REST routes under `/api`, one module per resource.

mod billing;
mod documentation;
mod employees;
mod inventory;
mod patients;
mod planning;
mod shifts;
mod tours;

use axum::http::Method;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::realtime;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .merge(patients::routes())
        .merge(employees::routes())
        .merge(tours::routes())
        .merge(shifts::routes())
        .merge(planning::routes())
        .merge(documentation::routes())
        .merge(billing::routes())
        .merge(inventory::routes());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .nest("/api", api)
        .route("/ws", get(realtime::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
