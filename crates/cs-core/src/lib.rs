pub mod error;
pub mod filter;
pub mod report;
pub mod timestamp;

pub use error::SourceError;
pub use filter::{
    filter_comments, CommentSource, CommentStream, MatchedComment, PhraseMatcher, RawComment,
};
pub use report::{render_report, Report};
pub use timestamp::{extract_timestamps, with_query_param, Timestamp};
