use thiserror::Error;

/// Failures raised while contacting or iterating a comment source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Unsupported video URL: {0}")]
    InvalidVideoUrl(String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Comments are disabled for video {0}")]
    CommentsDisabled(String),

    #[error("Request failed: {0}")]
    Http(String),

    #[error("Comment API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}
