use std::sync::Arc;
use axum::routing::{get, post};
use axum::Router;
use crate::backend::routes::job::{check_status, submit_request};
use crate::backend::state::BackendState;

mod job;

pub fn api_routes() -> Router<Arc<BackendState>> {
    Router::new()
        .route("/api/submit", post(submit_request))
        .route("/api/status/{request_id}", get(check_status))
}
