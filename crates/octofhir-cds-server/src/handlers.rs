use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use octofhir_api::{ApiError, ApiResponse};
use octofhir_cds_core::{DiscoveryResponse, HookResponse, Invocation};
use serde::Serialize;
use serde_json::json;

use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "service": "OctoFHIR CDS Hooks Server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "baseUrl": state.base_url.as_ref(),
        "services": state.dispatcher.registry().len(),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz() -> impl IntoResponse {
    // The registry and validators are built before the listener starts.
    (StatusCode::OK, Json(HealthResponse { status: "ready" }))
}

/// `GET /cds-services`
pub async fn discovery(State(state): State<AppState>) -> ApiResponse<DiscoveryResponse> {
    ApiResponse::ok(state.dispatcher.discover())
}

/// `POST /cds-services/{id}`
pub async fn invoke_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<HookResponse>, ApiError> {
    match state.dispatcher.invoke(&id, &body).await {
        Invocation::NotFound => Err(ApiError::NotFound),
        Invocation::Rejected(err) => Err(ApiError::Validation(err)),
        Invocation::Responded(response) => Ok(ApiResponse::ok(response)),
        Invocation::NoDecision => Ok(ApiResponse::ok(HookResponse::empty())),
        Invocation::Fault(err) => Err(ApiError::internal(err.to_string())),
    }
}

/// `POST /cds-services/{id}/feedback`
pub async fn feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<()>, ApiError> {
    state.dispatcher.feedback(&id, &body)?;
    Ok(ApiResponse::empty())
}

/// Plain `OPTIONS`; the CORS layers add the headers.
pub async fn preflight() -> ApiResponse<()> {
    ApiResponse::empty()
}
