//! Phrase filtering over a comment stream.

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use crate::error::SourceError;
use crate::timestamp::{extract_timestamps, with_query_param, Timestamp};

const PROGRESS_LOG_EVERY: usize = 100;

/// A comment as delivered by a [`CommentSource`]. Everything but the text is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComment {
    /// Platform identifier of the comment.
    pub cid: Option<String>,
    pub text: String,
    pub author: Option<String>,
    /// Display time as reported by the source.
    pub time: Option<String>,
    /// Like count.
    pub votes: Option<u64>,
}

/// A comment that contained every requested phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedComment {
    pub text: String,
    pub author: String,
    pub time: String,
    pub likes: u64,
    /// Direct link to the comment, or the bare video URL when the source gave no id.
    pub link: String,
    pub timestamps: Vec<Timestamp>,
}

impl MatchedComment {
    pub fn from_raw(comment: RawComment, video_url: &str) -> Self {
        let link = match comment.cid.as_deref() {
            Some(cid) if !cid.is_empty() => with_query_param(video_url, "lc", cid),
            _ => video_url.to_string(),
        };
        let timestamps = extract_timestamps(&comment.text, video_url);

        Self {
            author: comment.author.unwrap_or_else(|| "Unknown".to_string()),
            time: comment.time.unwrap_or_else(|| "Unknown".to_string()),
            likes: comment.votes.unwrap_or(0),
            link,
            timestamps,
            text: comment.text,
        }
    }
}

pub type CommentStream<'a> = BoxStream<'a, Result<RawComment, SourceError>>;

/// Anything that can list the public comments of a video, most recent first.
///
/// The stream is pulled lazily; implementations are expected to page through
/// the upstream as the consumer advances rather than collecting everything up front.
pub trait CommentSource: Send + Sync {
    fn comments<'a>(&'a self, video_url: &'a str) -> CommentStream<'a>;
}

/// Case-insensitive AND matcher over a fixed set of phrases.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    needles: Vec<String>,
}

impl PhraseMatcher {
    pub fn new(phrases: &[String]) -> Self {
        Self {
            needles: phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// True when every phrase occurs somewhere in `text`.
    pub fn matches(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.needles.iter().all(|needle| haystack.contains(needle.as_str()))
    }
}

/// Pull every comment for `video_url` from `source` and keep those containing all `phrases`.
///
/// Any source error discards the partial result and returns an empty list, so
/// callers cannot tell a failed fetch from a video with no matches.
pub async fn filter_comments<S>(source: &S, video_url: &str, phrases: &[String]) -> Vec<MatchedComment>
where
    S: CommentSource + ?Sized,
{
    info!(video_url, ?phrases, "Fetching comments");

    let matcher = PhraseMatcher::new(phrases);
    let mut stream = source.comments(video_url);
    let mut matched = Vec::new();
    let mut processed = 0usize;

    while let Some(item) = stream.next().await {
        let comment = match item {
            Ok(comment) => comment,
            Err(e) => {
                error!(video_url, error = %e, "Error getting comments");
                return Vec::new();
            }
        };

        processed += 1;
        if processed % PROGRESS_LOG_EVERY == 0 {
            info!(video_url, processed, "Processed comments so far");
        }

        if matcher.matches(&comment.text) {
            matched.push(MatchedComment::from_raw(comment, video_url));
        }
    }

    info!(
        video_url,
        processed,
        matched = matched.len(),
        "Finished filtering comments"
    );
    matched
}
