//! HTML page of the last two days of tweets, for copy-pasting into posts.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::warn;

use tweetdesk_types::TweetRecord;

use crate::timestamps::{beijing_display, parse_twitter_timestamp, shanghai_day_bounds, TimestampError};

pub const NO_TWEETS_MESSAGE: &str = "今天或昨天没有找到推文。";

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>最新热门推文</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; }
        h1 { color: #1da1f2; text-align: center; }
        .tweet { background-color: #f8f9fa; border: 1px solid #e1e8ed; border-radius: 10px; padding: 15px; margin-bottom: 20px; }
        .tweet-text { font-size: 16px; margin-bottom: 10px; }
        .tweet-info { font-size: 14px; color: #657786; }
        .tweet-link { color: #1da1f2; text-decoration: none; }
        .tweet-link:hover { text-decoration: underline; }
    </style>
</head>
<body>
    <h1>🔥 最新热门推文 🔥</h1>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

/// One renderable tweet.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestEntry {
    pub text: String,
    pub name: String,
    pub screen_name: String,
    pub created_at: DateTime<Utc>,
    pub link: String,
}

impl DigestEntry {
    pub fn from_content(content: &Value) -> Option<Self> {
        let screen_name = content.pointer("/user/screen_name")?.as_str()?;
        let rest_id = match content.get("rest_id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let created_at = parse_twitter_timestamp(content.get("created_at")?.as_str()?).ok()?;

        Some(Self {
            text: content
                .get("full_text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            name: content
                .pointer("/user/name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            screen_name: screen_name.to_string(),
            link: format!("https://twitter.com/{}/status/{}", screen_name, rest_id),
            created_at,
        })
    }
}

/// Inclusive UTC bounds of yesterday and today in Asia/Shanghai.
pub fn digest_window(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), TimestampError> {
    let (start, end) = shanghai_day_bounds(now, 1)?;
    Ok((start, end - Duration::seconds(1)))
}

/// Render `records`, newest first as given.
///
/// Records missing an author, id or readable timestamp are left out.
pub fn render(records: &[TweetRecord], now: DateTime<Utc>) -> String {
    let entries: Vec<DigestEntry> = records
        .iter()
        .filter_map(|record| {
            let entry = DigestEntry::from_content(&record.content);
            if entry.is_none() {
                warn!("Leaving tweet {} out of the digest: incomplete content", record.tweet_id);
            }
            entry
        })
        .collect();

    if entries.is_empty() {
        return NO_TWEETS_MESSAGE.to_string();
    }

    let mut html = String::from(PAGE_HEAD);
    html.push_str(&format!("    <p>更新时间: {} 北京时间</p>\n", beijing_display(&now)));

    for entry in &entries {
        let link = escape_html(&entry.link);
        html.push_str(&format!(
            r#"    <div class="tweet">
        <div class="tweet-text">{text}</div>
        <div class="tweet-info">
            <p>👤 作者: {name} @{screen_name}</p>
            <p>🕒 时间: {time}</p>
            <p>🔗 链接: <a href="{link}" target="_blank" class="tweet-link">{link}</a></p>
        </div>
    </div>
"#,
            text = escape_html(&entry.text),
            name = escape_html(&entry.name),
            screen_name = escape_html(&entry.screen_name),
            time = beijing_display(&entry.created_at),
            link = link,
        ));
    }

    html.push_str(PAGE_TAIL);
    html
}

pub fn render_error(message: &str) -> String {
    format!("<h1>发生错误</h1><p>{}</p>", escape_html(message))
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
