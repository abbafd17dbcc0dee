use std::sync::Arc;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use crate::backend::error::ApiError;
use crate::backend::schemas::SubmitResponse;
use crate::backend::state::BackendState;
use crate::job::Job;
use crate::service::SubmitRequest;

pub async fn submit_request(
    State(state): State<Arc<BackendState>>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let job = state.service.submit(request).await?;

    Ok(Json(SubmitResponse {
        request_id: job.id,
        status: job.status,
        message: "Request submitted successfully".to_string(),
    }))
}

pub async fn check_status(
    State(state): State<Arc<BackendState>>,
    Path(request_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    state
        .service
        .status(&request_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Request not found"))
}
