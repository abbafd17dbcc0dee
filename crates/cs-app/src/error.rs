use std::path::PathBuf;
use thiserror::Error;
use crate::job::JobStatus;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read queue file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write queue file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse queue file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Job already exists: {0}")]
    DuplicateJob(String),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Queued job {0} has no record")]
    MissingRecord(String),
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Failures that end a job in the `failed` state.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Job task panicked: {0}")]
    Panicked(String),

    #[error("Job task was cancelled")]
    Cancelled,
}

impl From<tokio::task::JoinError> for JobError {
    fn from(err: tokio::task::JoinError) -> Self {
        if !err.is_panic() {
            return Self::Cancelled;
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panicked(message)
    }
}

/// Submission rejected before any job was created.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid YouTube URL")]
    InvalidVideoUrl,

    #[error("Phrases must be a non-empty list")]
    InvalidPhrases,

    #[error("Email must be a string")]
    InvalidEmail,

    #[error(transparent)]
    Store(#[from] StoreError),
}
