use std::sync::LazyLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]{1,2}:[0-9]{2}(?::[0-9]{2})?)\b").unwrap());

/// A time reference found in comment text, e.g. `1:23` or `10:05:30`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// The matched text exactly as written.
    pub text: String,
    /// Offset into the video in seconds.
    pub seconds: u64,
    /// Video URL that starts playback at `seconds`.
    pub link: String,
}

/// Find every `H:MM:SS` / `MM:SS` reference in `text`, left to right.
///
/// Groups are read as a base-60 number without range checks, so `1:99`
/// yields 159 seconds.
pub fn extract_timestamps(text: &str, video_url: &str) -> Vec<Timestamp> {
    RE_TIMESTAMP
        .find_iter(text)
        .map(|m| {
            let seconds = to_seconds(m.as_str());
            Timestamp {
                text: m.as_str().to_string(),
                seconds,
                link: with_query_param(video_url, "t", &format!("{}s", seconds)),
            }
        })
        .collect()
}

/// Append `key=value` to `url`, using `&` when a query string is already present.
pub fn with_query_param(url: &str, key: &str, value: &str) -> String {
    let delimiter = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, delimiter, key, value)
}

fn to_seconds(timestamp: &str) -> u64 {
    timestamp
        .split(':')
        .filter_map(|part| part.parse::<u64>().ok())
        .fold(0, |total, part| total * 60 + part)
}
