use std::sync::Arc;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::info;
use crate::error::SubmitError;
use crate::job::Job;
use crate::store::JobStore;

/// Submission payload exactly as the caller sent it. `None` means the key was
/// absent; an explicit `null` arrives as `Some(Value::Null)`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
    #[serde(default, deserialize_with = "present")]
    pub video_url: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub phrases: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Recognises the watch and short-link shapes; anything else is rejected up front.
pub fn is_video_url(url: &str) -> bool {
    url.contains("youtube.com/watch") || url.contains("youtu.be/")
}

fn parse_phrases(value: Value) -> Result<Vec<String>, SubmitError> {
    let Value::Array(items) = value else {
        return Err(SubmitError::InvalidPhrases);
    };
    if items.is_empty() {
        return Err(SubmitError::InvalidPhrases);
    }
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            _ => Err(SubmitError::InvalidPhrases),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct SubmissionService {
    store: Arc<JobStore>,
}

impl SubmissionService {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }

    /// Validate `request` and queue it as a new pending job.
    pub async fn submit(&self, request: SubmitRequest) -> Result<Job, SubmitError> {
        let video_url = request.video_url.ok_or(SubmitError::MissingField("video_url"))?;
        let phrases = request.phrases.ok_or(SubmitError::MissingField("phrases"))?;
        let email = request.email.ok_or(SubmitError::MissingField("email"))?;

        let video_url = match video_url {
            Value::String(url) if is_video_url(&url) => url,
            _ => return Err(SubmitError::InvalidVideoUrl),
        };
        let phrases = parse_phrases(phrases)?;
        let Value::String(email) = email else {
            return Err(SubmitError::InvalidEmail);
        };

        let job = self.store.enqueue(Job::new(video_url, phrases, email)).await?;
        info!(job_id = %job.id, video_url = %job.video_url, "Request submitted");
        Ok(job)
    }

    pub async fn status(&self, id: &str) -> Option<Job> {
        self.store.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use serde_json::json;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> SubmissionService {
        SubmissionService::new(Arc::new(JobStore::new(dir.path().join("queue.json"))))
    }

    fn request(value: Value) -> SubmitRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_video_url_shapes() {
        assert!(is_video_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_video_url("https://youtu.be/abc"));
        assert!(!is_video_url("https://www.youtube.com/channel/abc"));
        assert!(!is_video_url("https://vimeo.com/123"));
    }

    #[tokio::test]
    async fn test_submit_creates_pending_job() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let job = service
            .submit(request(json!({
                "video_url": "https://youtu.be/abc",
                "phrases": ["great", "song"],
                "email": "me@example.com"
            })))
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.phrases, vec!["great".to_string(), "song".to_string()]);

        let status = service.status(&job.id).await.unwrap();
        assert_eq!(status.status, JobStatus::Pending);
        assert!(dir.path().join("queue.json").exists());
    }

    #[tokio::test]
    async fn test_missing_fields_are_named_in_order() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service.submit(request(json!({}))).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: video_url");

        let err = service
            .submit(request(json!({
                "video_url": "https://youtu.be/abc",
                "phrases": ["a"]
            })))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: email");

        let err = service
            .submit(request(json!({
                "video_url": "https://youtu.be/abc",
                "email": "me@example.com"
            })))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: phrases");
    }

    #[tokio::test]
    async fn test_present_but_empty_values_fail_their_own_checks() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service
            .submit(request(json!({
                "video_url": "",
                "phrases": ["a"],
                "email": "me@example.com"
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidVideoUrl));

        let err = service
            .submit(request(json!({
                "video_url": null,
                "phrases": ["a"],
                "email": "me@example.com"
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidVideoUrl));

        let err = service
            .submit(request(json!({
                "video_url": "https://youtu.be/abc",
                "phrases": null,
                "email": "me@example.com"
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidPhrases));

        let err = service
            .submit(request(json!({
                "video_url": "https://youtu.be/abc",
                "phrases": ["a"],
                "email": 42
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidEmail));

        // Only presence is checked for the address itself.
        let job = service
            .submit(request(json!({
                "video_url": "https://youtu.be/abc",
                "phrases": ["a"],
                "email": ""
            })))
            .await
            .unwrap();
        assert_eq!(job.email, "");
    }

    #[tokio::test]
    async fn test_url_checked_before_phrases() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service
            .submit(request(json!({
                "video_url": "https://vimeo.com/1",
                "phrases": [],
                "email": "me@example.com"
            })))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::InvalidVideoUrl));
    }

    #[tokio::test]
    async fn test_invalid_phrases() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        for phrases in [json!([]), json!("single"), json!(["ok", 3])] {
            let err = service
                .submit(request(json!({
                    "video_url": "https://www.youtube.com/watch?v=abc",
                    "phrases": phrases,
                    "email": "me@example.com"
                })))
                .await
                .unwrap_err();
            assert!(matches!(err, SubmitError::InvalidPhrases));
        }
        assert_eq!(service.store.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_status() {
        let dir = TempDir::new().unwrap();
        assert!(service(&dir).status("nope").await.is_none());
    }
}
