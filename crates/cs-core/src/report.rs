//! HTML email report for a finished search.

use std::fmt::Write;
use chrono::{DateTime, TimeZone};
use crate::filter::MatchedComment;

/// A rendered report, ready to hand to a mail transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub html: String,
}

pub fn render_report<Tz>(
    video_url: &str,
    phrases: &[String],
    comments: &[MatchedComment],
    generated_on: DateTime<Tz>,
) -> Report
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let subject = format!("YouTube Comment Search Results: {}", phrases.join(", "));

    // Writing into a String cannot fail, so the fmt::Results below are discarded.
    let mut html = String::new();
    html.push_str(
        r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body { font-family: Arial, sans-serif; margin: 20px; color: #222; }
        .summary { padding: 15px; background-color: #f9f9f9; border-radius: 5px; }
        .comment { border-left: 4px solid #c00; padding: 10px 15px; margin: 15px 0; }
        .meta { color: #666; font-size: 12px; }
        .footer { color: #666; font-size: 12px; margin-top: 20px; }
    </style>
</head>
<body>
    <h2>YouTube Comment Search Results</h2>
    <div class="summary">
"#,
    );

    let _ = writeln!(
        html,
        r#"        <p>Video: <a href="{url}">{url}</a></p>"#,
        url = escape_html(video_url)
    );
    html.push_str("        <p>Phrases:</p>\n        <ul>\n");
    for phrase in phrases {
        let _ = writeln!(html, "            <li>{}</li>", escape_html(phrase));
    }
    html.push_str("        </ul>\n");
    let _ = writeln!(html, "        <p>Matching comments: {}</p>", comments.len());
    html.push_str("    </div>\n");

    if comments.is_empty() {
        html.push_str("    <p>No comments matched all of the phrases.</p>\n");
    }

    for comment in comments {
        render_comment(&mut html, comment);
    }

    let _ = writeln!(
        html,
        r#"    <div class="footer"><p>Generated on {}</p></div>"#,
        generated_on.format("%B %d, %Y at %I:%M %p")
    );
    html.push_str("</body>\n</html>\n");

    Report { subject, html }
}

fn render_comment(html: &mut String, comment: &MatchedComment) {
    html.push_str("    <div class=\"comment\">\n");
    let _ = writeln!(
        html,
        r#"        <p class="meta"><strong>{}</strong> &middot; {} &middot; {} likes</p>"#,
        escape_html(&comment.author),
        escape_html(&comment.time),
        comment.likes
    );
    let _ = writeln!(html, "        <p>{}</p>", escape_html(&comment.text));

    if !comment.timestamps.is_empty() {
        html.push_str("        <p class=\"meta\">Timestamps:");
        for ts in &comment.timestamps {
            let _ = write!(
                html,
                r#" <a href="{}">{}</a>"#,
                escape_html(&ts.link),
                escape_html(&ts.text)
            );
        }
        html.push_str("</p>\n");
    }

    let _ = writeln!(
        html,
        r#"        <p><a href="{}">View comment</a></p>"#,
        escape_html(&comment.link)
    );
    html.push_str("    </div>\n");
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
