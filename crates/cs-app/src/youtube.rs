//! Comment source backed by the YouTube Data API v3 `commentThreads` endpoint.

use cs_core::{CommentSource, CommentStream, RawComment, SourceError};
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use crate::config::YoutubeConfig;

const PAGE_SIZE: &str = "100";

fn is_youtube_host(host: &str) -> bool {
    let h = host.to_ascii_lowercase();
    h == "youtube.com"
        || h == "www.youtube.com"
        || h == "m.youtube.com"
        || h == "youtu.be"
        || h.ends_with(".youtube.com")
}

/// Extract the video id from watch, short, shorts and embed URLs.
pub fn video_id_from_url(raw: &str) -> Option<String> {
    let u = url::Url::parse(raw).ok()?;
    let host = u.host_str()?;
    if !is_youtube_host(host) {
        return None;
    }

    // youtu.be/<id>
    if host.eq_ignore_ascii_case("youtu.be") {
        let seg = u.path_segments()?.next()?.trim();
        return (!seg.is_empty()).then(|| seg.to_string());
    }

    // youtube.com/watch?v=<id>
    if u.path().starts_with("/watch") {
        return u
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty());
    }

    // youtube.com/shorts/<id>, /embed/<id>
    let mut segs = u.path_segments()?;
    let kind = segs.next().unwrap_or("");
    let id = segs.next().unwrap_or("").trim();
    if (kind == "shorts" || kind == "embed") && !id.is_empty() {
        return Some(id.to_string());
    }

    None
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadListResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    id: String,
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    author_display_name: Option<String>,
    #[serde(default)]
    text_original: String,
    #[serde(default)]
    text_display: String,
    published_at: Option<String>,
    like_count: Option<u64>,
}

impl From<CommentThread> for RawComment {
    fn from(thread: CommentThread) -> Self {
        let snippet = thread.snippet.top_level_comment.snippet;
        let text = if snippet.text_original.is_empty() {
            snippet.text_display
        } else {
            snippet.text_original
        };
        Self {
            cid: Some(thread.id),
            text,
            author: snippet.author_display_name,
            time: snippet.published_at,
            votes: snippet.like_count,
        }
    }
}

struct CommentPage {
    comments: Vec<RawComment>,
    next_page_token: Option<String>,
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

pub struct YoutubeSource {
    client: reqwest::Client,
    config: YoutubeConfig,
}

impl YoutubeSource {
    pub fn new(config: YoutubeConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    async fn fetch_page(
        &self,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentPage, SourceError> {
        let url = format!(
            "{}/commentThreads",
            self.config.api_base.trim_end_matches('/')
        );
        let mut query = vec![
            ("part", "snippet"),
            ("videoId", video_id),
            ("order", "time"),
            ("textFormat", "plainText"),
            ("maxResults", PAGE_SIZE),
            ("key", self.config.api_key.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(video_id, status, body));
        }

        let data: ThreadListResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        debug!(
            video_id,
            count = data.items.len(),
            has_next = data.next_page_token.is_some(),
            "Fetched comment page"
        );

        Ok(CommentPage {
            comments: data.items.into_iter().map(RawComment::from).collect(),
            next_page_token: data.next_page_token,
        })
    }
}

fn classify_error(video_id: &str, status: StatusCode, body: String) -> SourceError {
    if status == StatusCode::NOT_FOUND || body.contains("videoNotFound") {
        SourceError::VideoNotFound(video_id.to_string())
    } else if body.contains("commentsDisabled") {
        SourceError::CommentsDisabled(video_id.to_string())
    } else {
        SourceError::Api {
            status: status.as_u16(),
            body,
        }
    }
}

impl CommentSource for YoutubeSource {
    fn comments<'a>(&'a self, video_url: &'a str) -> CommentStream<'a> {
        let Some(video_id) = video_id_from_url(video_url) else {
            return stream::once(async move {
                Err::<RawComment, _>(SourceError::InvalidVideoUrl(video_url.to_string()))
            })
            .boxed();
        };

        // One page per pull; the next request is only made once the consumer
        // has drained the current page.
        stream::try_unfold(Cursor::Start, move |cursor| {
            let video_id = video_id.clone();
            async move {
                let token = match cursor {
                    Cursor::Start => None,
                    Cursor::Next(token) => Some(token),
                    Cursor::Done => return Ok::<_, SourceError>(None),
                };
                let page = self.fetch_page(&video_id, token.as_deref()).await?;
                let next = match page.next_page_token {
                    Some(token) if !token.is_empty() => Cursor::Next(token),
                    _ => Cursor::Done,
                };
                Ok(Some((page.comments, next)))
            }
        })
        .map_ok(|comments| stream::iter(comments.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }
}
