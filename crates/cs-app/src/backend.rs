mod error;
mod routes;
mod schemas;
mod state;

use std::sync::Arc;
use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;
use crate::backend::routes::api_routes;
use crate::backend::state::BackendState;
use crate::config::ServerConfig;
use crate::service::SubmissionService;

pub fn router(service: SubmissionService) -> Router {
    Router::new()
        .merge(api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(BackendState::new(service)))
}

/// Serve the API until `shutdown` flips to true or its sender is dropped.
pub async fn serve(
    config: &ServerConfig,
    service: SubmissionService,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Starting backend server on {}", addr);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("Server failed")?;

    info!("Backend server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JobStore;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(dir: &TempDir) -> Router {
        let store = Arc::new(JobStore::new(dir.path().join("queue.json")));
        router(SubmissionService::new(store))
    }

    fn submit(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/submit")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    fn status(id: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/api/status/{}", id))
            .body(Body::empty())
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_submit_then_status() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir);

        let body = json!({
            "video_url": "https://www.youtube.com/watch?v=abc",
            "phrases": ["first", "second"],
            "email": "me@example.com"
        });
        let response = app
            .clone()
            .oneshot(submit(body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let created = read_json(response).await;
        assert_eq!(created["status"], "pending");
        assert_eq!(created["message"], "Request submitted successfully");
        let id = created["request_id"].as_str().unwrap().to_string();

        let response = app.oneshot(status(&id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let record = read_json(response).await;
        assert_eq!(record["id"], id.as_str());
        assert_eq!(record["status"], "pending");
        assert_eq!(record["phrases"], json!(["first", "second"]));
        assert_eq!(record["email"], "me@example.com");
        assert!(record.get("result").is_none());
    }

    #[tokio::test]
    async fn test_missing_email_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let body = json!({
            "video_url": "https://youtu.be/abc",
            "phrases": ["x"]
        });
        let response = app(&dir).oneshot(submit(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "Missing required field: email");
    }

    #[tokio::test]
    async fn test_empty_phrases_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let body = json!({
            "video_url": "https://youtu.be/abc",
            "phrases": [],
            "email": "me@example.com"
        });
        let response = app(&dir).oneshot(submit(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "Phrases must be a non-empty list");
    }

    #[tokio::test]
    async fn test_invalid_url_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let body = json!({
            "video_url": "https://example.com/video",
            "phrases": ["x"],
            "email": "me@example.com"
        });
        let response = app(&dir).oneshot(submit(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "Invalid YouTube URL");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir).oneshot(submit("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(read_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_request_is_not_found() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir).oneshot(status("missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_json(response).await["error"], "Request not found");
    }
}
