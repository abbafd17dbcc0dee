use std::fmt;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Jobs only move forward: pending -> processing -> completed | failed.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobResult {
    pub comment_count: usize,
    /// Delivery can fail while the job still completes.
    pub email_sent: bool,
}

/// One comment-search-and-email request and its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Records written without an id take their key in the queue file.
    #[serde(default)]
    pub id: String,
    pub video_url: String,
    pub phrases: Vec<String>,
    pub email: String,
    pub status: JobStatus,
    #[serde(deserialize_with = "deserialize_time")]
    pub submission_time: DateTime<Utc>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub fn new(video_url: String, phrases: Vec<String>, email: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            video_url,
            phrases,
            email,
            status: JobStatus::Pending,
            submission_time: Utc::now(),
            completion_time: None,
            result: None,
            error: None,
        }
    }
}

/// Parses RFC 3339, or an offset-less ISO 8601 time taken as local time.
/// Older queue files were written in the second form.
fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    let naive: NaiveDateTime = raw.parse().ok()?;
    // A local time skipped by a DST jump has no mapping; read it as UTC.
    Some(match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => naive.and_utc(),
    })
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

fn deserialize_optional_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_time(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(
            "https://www.youtube.com/watch?v=abc".to_string(),
            vec!["hello".to_string()],
            "me@example.com".to_string(),
        )
    }

    #[test]
    fn test_new_job_is_pending_with_unique_id() {
        let a = job();
        let b = job();
        assert_eq!(a.status, JobStatus::Pending);
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert!(a.result.is_none());
        assert!(a.completion_time.is_none());
    }

    #[test]
    fn test_transitions() {
        use JobStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Processing));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_serialized_shape() {
        let mut job = job();
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "pending");
        assert!(value.get("result").is_none());
        assert!(value.get("error").is_none());
        assert!(value.get("completion_time").is_none());

        job.status = JobStatus::Completed;
        job.result = Some(JobResult {
            comment_count: 4,
            email_sent: false,
        });
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["result"]["comment_count"], 4);
        assert_eq!(value["result"]["email_sent"], false);
    }

    #[test]
    fn test_parse_time_formats() {
        let utc = parse_time("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-01-15T10:30:00+00:00");

        let offset = parse_time("2024-01-15T12:30:00+02:00").unwrap();
        assert_eq!(offset, utc);

        let naive = "2024-01-15T10:30:00.123456";
        let expected = Local
            .from_local_datetime(&naive.parse::<NaiveDateTime>().unwrap())
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_time(naive), Some(expected));
        assert!(parse_time("2024-01-15T10:30:00").is_some());

        assert!(parse_time("yesterday").is_none());
    }

    #[test]
    fn test_record_with_naive_times_deserializes() {
        let raw = r#"{
            "video_url": "https://www.youtube.com/watch?v=abc",
            "phrases": ["a"],
            "email": "x@example.com",
            "status": "completed",
            "submission_time": "2024-01-15T10:30:00.123456",
            "completion_time": "2024-01-15T10:31:05.000001",
            "result": {"comment_count": 3, "email_sent": true}
        }"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completion_time.unwrap() > job.submission_time);

        // Written back out with an explicit offset.
        let value = serde_json::to_value(&job).unwrap();
        let written = value["submission_time"].as_str().unwrap();
        assert_eq!(parse_time(written), Some(job.submission_time));
        assert!(DateTime::parse_from_rfc3339(written).is_ok());
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let raw = r#"{
            "video_url": "https://youtu.be/abc",
            "phrases": ["a"],
            "email": "x@example.com",
            "status": "pending",
            "submission_time": "not a time"
        }"#;
        assert!(serde_json::from_str::<Job>(raw).is_err());
    }

    #[test]
    fn test_record_without_id_deserializes() {
        let raw = r#"{
            "video_url": "https://youtu.be/abc",
            "phrases": ["a"],
            "email": "x@example.com",
            "status": "failed",
            "submission_time": "2024-01-15T10:30:00Z",
            "error": "boom"
        }"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        assert!(job.id.is_empty());
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
    }
}
